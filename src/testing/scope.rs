//! Expanding a requested scope into the states to test
//!
//! A state includes other states, and several top-level states can include
//! the same one. Expansion flattens all of that into one list where every
//! state appears once, in the order it was first seen.

use std::collections::HashSet;

use crate::common::Result;
use crate::host::StateTopology;

/// The states a run covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Expanded states in discovery order, without duplicates
    pub states: Vec<String>,
    /// Requested states whose expansion failed; they have no tests
    pub unresolved: Vec<String>,
}

impl Resolution {
    /// Every state the run reports on
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .chain(&self.unresolved)
            .map(String::as_str)
    }
}

pub struct StateScopeResolver<'a, T: StateTopology + ?Sized> {
    topology: &'a T,
}

impl<'a, T: StateTopology + ?Sized> StateScopeResolver<'a, T> {
    pub fn new(topology: &'a T) -> Self {
        Self { topology }
    }

    /// Resolve one state, or the whole highstate when `scope` is `None`
    ///
    /// Failing to list the top file is an error. Failing to expand a single
    /// state is logged and leaves that state unresolved.
    pub fn resolve(&self, scope: Option<&str>) -> Result<Resolution> {
        let requested = match scope {
            Some(state) => vec![state.to_string()],
            None => self.topology.list_top_level_states()?,
        };

        let mut visited = HashSet::new();
        let mut expanded = HashSet::new();
        let mut resolution = Resolution::default();
        for state in &requested {
            self.expand(state, &mut expanded, &mut visited, &mut resolution);
        }
        resolution.unresolved.retain(|state| !visited.contains(state));

        tracing::info!(
            states = resolution.states.len(),
            unresolved = resolution.unresolved.len(),
            "resolved scope"
        );
        Ok(resolution)
    }

    fn expand(
        &self,
        state: &str,
        expanded: &mut HashSet<String>,
        visited: &mut HashSet<String>,
        resolution: &mut Resolution,
    ) {
        if !expanded.insert(state.to_string()) {
            return;
        }

        match self.topology.list_sub_states(state) {
            Ok(sub_states) => {
                for sub in sub_states {
                    if visited.insert(sub.clone()) {
                        resolution.states.push(sub);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(state, error = %e, "Unable to list states, no tests will run for it");
                if !resolution.unresolved.iter().any(|s| s == state) {
                    resolution.unresolved.push(state.to_string());
                }
            }
        }
    }
}
