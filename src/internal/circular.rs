//! Per-thread tracking of prototype beans under construction.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{BeanError, BeanResult};

/// Names of prototypes being created, keyed by the creating thread.
///
/// A prototype that is requested again by the same thread while it is still being
/// built can never be satisfied, so it fails fast instead of recursing.
#[derive(Debug, Default)]
pub(crate) struct PrototypesInCreation {
    by_thread: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl PrototypesInCreation {
    /// Marks `name` as in creation on this thread until the guard drops.
    pub(crate) fn enter(&self, name: &str) -> BeanResult<PrototypeGuard<'_>> {
        let mut by_thread = self.by_thread.lock();
        let stack = by_thread.entry(thread::current().id()).or_default();
        if stack.iter().any(|n| n == name) {
            return Err(BeanError::CurrentlyInCreation {
                bean_name: name.to_string(),
            });
        }
        stack.push(name.to_string());
        Ok(PrototypeGuard {
            owner: self,
            name: name.to_string(),
        })
    }

    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        self.by_thread
            .lock()
            .get(&thread::current().id())
            .map_or(false, |stack| stack.iter().any(|n| n == name))
    }
}

#[derive(Debug)]
pub(crate) struct PrototypeGuard<'a> {
    owner: &'a PrototypesInCreation,
    name: String,
}

impl Drop for PrototypeGuard<'_> {
    fn drop(&mut self) {
        let id = thread::current().id();
        let mut by_thread = self.owner.by_thread.lock();
        if let Some(stack) = by_thread.get_mut(&id) {
            if let Some(pos) = stack.iter().rposition(|n| *n == self.name) {
                stack.remove(pos);
            }
            if stack.is_empty() {
                by_thread.remove(&id);
            }
        }
    }
}
