//! Observers of bean creation, for tracing and diagnostics.
//!
//! Every creation attempt walks through a fixed set of [`CreationState`]s. Observers
//! registered on the factory see each transition, the total creation time and any failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BeanError;

/// Stage of a single bean creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreationState {
    Uncreated,
    /// Definition merged, type being resolved
    Resolving,
    /// A before-instantiation processor supplied the bean
    ShortCircuited,
    Instantiating,
    /// Raw instance registered for early reference
    EarlyExposed,
    Populating,
    Initializing,
    Ready,
    Failed,
}

impl CreationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CreationState::Ready | CreationState::ShortCircuited | CreationState::Failed
        )
    }
}

/// Observer trait for bean creation events.
///
/// Observer calls are made synchronously on the creating thread; keep them cheap.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanDefinition, BeanFactory, BeanType, CreationObserver, CreationState};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<(String, CreationState)>>);
///
/// impl CreationObserver for Recorder {
///     fn transition(&self, bean_name: &str, _from: CreationState, to: CreationState) {
///         self.0.lock().unwrap().push((bean_name.to_string(), to));
///     }
/// }
///
/// #[derive(Default)]
/// struct Clock;
///
/// let recorder = Arc::new(Recorder::default());
/// let factory = BeanFactory::builder()
///     .register_type(BeanType::of::<Clock>().default_constructor(Clock::default).build())
///     .define("clock", BeanDefinition::of::<Clock>())
///     .observer(recorder.clone())
///     .build();
///
/// factory.get_bean("clock").unwrap();
/// let states: Vec<_> = recorder.0.lock().unwrap().iter().map(|(_, s)| *s).collect();
/// assert_eq!(states.first(), Some(&CreationState::Resolving));
/// assert_eq!(states.last(), Some(&CreationState::Ready));
/// ```
pub trait CreationObserver: Send + Sync {
    fn transition(&self, bean_name: &str, from: CreationState, to: CreationState);

    /// Called once the bean reached `Ready`.
    fn created(&self, _bean_name: &str, _duration: Duration) {}

    /// Called when creation ended in `Failed`.
    fn failed(&self, _bean_name: &str, _error: &BeanError) {}
}

/// Container for registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn CreationObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn CreationObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Starts tracking one creation attempt.
    pub(crate) fn track<'a>(&'a self, bean_name: &'a str) -> CreationTracker<'a> {
        CreationTracker {
            observers: self,
            bean_name,
            state: CreationState::Uncreated,
            started: Instant::now(),
        }
    }
}

/// State machine of one creation attempt, notifying observers on each move.
pub(crate) struct CreationTracker<'a> {
    observers: &'a Observers,
    bean_name: &'a str,
    state: CreationState,
    started: Instant,
}

impl CreationTracker<'_> {
    pub(crate) fn advance(&mut self, to: CreationState) {
        let from = std::mem::replace(&mut self.state, to);
        if from == to {
            return;
        }
        tracing::trace!(bean = self.bean_name, ?from, ?to, "Creation state changed");
        if !self.observers.has_observers() {
            return;
        }
        for observer in &self.observers.observers {
            observer.transition(self.bean_name, from, to);
        }
        if to == CreationState::Ready {
            let elapsed = self.started.elapsed();
            for observer in &self.observers.observers {
                observer.created(self.bean_name, elapsed);
            }
        }
    }

    pub(crate) fn fail(&mut self, error: &BeanError) {
        if self.state.is_terminal() {
            return;
        }
        self.advance(CreationState::Failed);
        for observer in &self.observers.observers {
            observer.failed(self.bean_name, error);
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CreationState {
        self.state
    }
}

/// Built-in observer that logs creation events through `tracing`.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanFactory, LoggingObserver};
/// use std::sync::Arc;
///
/// let factory = BeanFactory::builder()
///     .observer(Arc::new(LoggingObserver::with_prefix("[app]")))
///     .build();
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "[ferrous-beans]".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl CreationObserver for LoggingObserver {
    fn transition(&self, bean_name: &str, from: CreationState, to: CreationState) {
        tracing::debug!("{} {}: {:?} -> {:?}", self.prefix, bean_name, from, to);
    }

    fn created(&self, bean_name: &str, duration: Duration) {
        tracing::debug!("{} Created bean '{}' in {:?}", self.prefix, bean_name, duration);
    }

    fn failed(&self, bean_name: &str, error: &BeanError) {
        tracing::warn!("{} Creation of bean '{}' failed: {}", self.prefix, bean_name, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CreationState>>,
        failures: Mutex<usize>,
    }

    impl CreationObserver for Recorder {
        fn transition(&self, _bean_name: &str, _from: CreationState, to: CreationState) {
            self.seen.lock().unwrap().push(to);
        }

        fn failed(&self, _bean_name: &str, _error: &BeanError) {
            *self.failures.lock().unwrap() += 1;
        }
    }

    #[test]
    fn failure_reported_once() {
        let recorder = Arc::new(Recorder::default());
        let mut observers = Observers::default();
        observers.add(recorder.clone());

        let mut tracker = observers.track("x");
        tracker.advance(CreationState::Resolving);
        tracker.advance(CreationState::Instantiating);
        let err = BeanError::NoSuchBean {
            bean_name: "x".into(),
        };
        tracker.fail(&err);
        tracker.fail(&err);

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![
                CreationState::Resolving,
                CreationState::Instantiating,
                CreationState::Failed
            ]
        );
        assert_eq!(*recorder.failures.lock().unwrap(), 1);
        assert_eq!(tracker.state(), CreationState::Failed);
    }
}
