//! Dependency edges between beans, used for destruction order.

use std::collections::{HashMap, HashSet};

/// Bean → dependents and bean → dependencies, both in insertion order.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    dependents: HashMap<String, Vec<String>>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Records that `dependent` depends on `bean`.
    pub(crate) fn register(&mut self, bean: &str, dependent: &str) {
        let dependents = self.dependents.entry(bean.to_string()).or_default();
        if dependents.iter().any(|d| d == dependent) {
            return;
        }
        dependents.push(dependent.to_string());
        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .push(bean.to_string());
    }

    pub(crate) fn dependents_of(&self, bean: &str) -> Vec<String> {
        self.dependents.get(bean).cloned().unwrap_or_default()
    }

    pub(crate) fn dependencies_of(&self, bean: &str) -> Vec<String> {
        self.dependencies.get(bean).cloned().unwrap_or_default()
    }

    pub(crate) fn has_dependents(&self, bean: &str) -> bool {
        self.dependents.get(bean).map_or(false, |d| !d.is_empty())
    }

    /// Whether `dependent` depends on `bean`, directly or transitively.
    pub(crate) fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        let mut seen = HashSet::new();
        self.is_dependent_inner(bean, dependent, &mut seen)
    }

    fn is_dependent_inner<'a>(&'a self, bean: &'a str, dependent: &str, seen: &mut HashSet<&'a str>) -> bool {
        if !seen.insert(bean) {
            return false;
        }
        let Some(direct) = self.dependents.get(bean) else {
            return false;
        };
        direct.iter().any(|d| d == dependent)
            || direct
                .iter()
                .any(|transitive| self.is_dependent_inner(transitive, dependent, seen))
    }

    pub(crate) fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
    }
}
