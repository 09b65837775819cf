//! Concurrent scenario table.
//!
//! Keys combine the path template and method; the value is the ordered list
//! of scenarios registered under that key. Writers publish a brand-new list
//! on every append (copy-on-write) so readers that captured a snapshot never
//! observe a half-built list.

use std::sync::Arc;

use dashmap::DashMap;

use crate::scenario::spec::Scenario;

/// A published, immutable scenario list snapshot.
pub type ScenarioList = Arc<Vec<Arc<Scenario>>>;

/// Build the registry key for a path template and method.
pub fn scenario_key(path: &str, method: &str) -> String {
    format!("{}_{}", normalize_path(path), method.to_uppercase())
}

/// Strict-slash normalization: `/a/` and `/a` are the same key.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Concurrent table of registered scenarios.
#[derive(Default)]
pub struct ScenarioRegistry {
    table: DashMap<String, ScenarioList>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scenario under its key, publishing a new list so ongoing
    /// iterators see either the old list in full or the new one in full.
    ///
    /// A second add of an identical scenario appends a duplicate entry:
    /// insertion order is match precedence, so duplicates are harmless.
    pub fn add(&self, scenario: Scenario) {
        let key = scenario_key(&scenario.path, &scenario.method);
        let scenario = Arc::new(scenario);
        self.table
            .entry(key)
            .and_modify(|list| {
                let mut next = Vec::with_capacity(list.len() + 1);
                next.extend(list.iter().cloned());
                next.push(scenario.clone());
                *list = Arc::new(next);
            })
            .or_insert_with(|| Arc::new(vec![scenario]));
    }

    /// Snapshot the scenario list for a key, if any.
    pub fn lookup(&self, key: &str) -> Option<ScenarioList> {
        self.table.get(key).map(|entry| entry.value().clone())
    }

    /// Visit every (key, list) pair. Lists are stable snapshots.
    pub fn iterate<F>(&self, mut f: F)
    where
        F: FnMut(&str, &ScenarioList) -> bool,
    {
        for entry in self.table.iter() {
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
