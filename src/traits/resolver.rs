//! Disambiguation of autowiring candidates.

use crate::key::TypeKey;

/// Picks one bean when several match a property's type during by-type autowiring.
///
/// Without a resolver, or when it declines, several candidates are an
/// [`UnsatisfiedDependency`](crate::BeanError::UnsatisfiedDependency) error.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{AutowireCandidateResolver, TypeKey};
///
/// /// Prefers the candidate whose name starts with "primary".
/// struct PrimaryFirst;
///
/// impl AutowireCandidateResolver for PrimaryFirst {
///     fn select(&self, _bean: &str, _property: &str, _target: &TypeKey, candidates: &[String]) -> Option<String> {
///         candidates.iter().find(|c| c.starts_with("primary")).cloned()
///     }
/// }
///
/// let pick = PrimaryFirst.select("service", "repo", &TypeKey::of::<u8>(), &["backup".into(), "primaryRepo".into()]);
/// assert_eq!(pick.as_deref(), Some("primaryRepo"));
/// ```
pub trait AutowireCandidateResolver: Send + Sync {
    /// Returns the chosen candidate name, or `None` to leave the ambiguity unresolved.
    fn select(
        &self,
        bean_name: &str,
        property: &str,
        target: &TypeKey,
        candidates: &[String],
    ) -> Option<String>;
}
