//! Interfaces to the managed host
//!
//! The engine never talks to salt directly. Everything it needs from the
//! minion goes through these traits: executing functions, listing modules,
//! expanding states, rendering test files, and syncing the file cache.
//! Every call blocks and is attempted exactly once.

mod salt_call;
mod yaml;

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::common::Result;

pub use salt_call::SaltCall;
pub use yaml::YamlRenderer;

/// Executes `module.function` on the minion
pub trait ActionInvoker {
    fn invoke(&self, function: &str, args: &[Value], kwargs: &Map<String, Value>) -> Result<Value>;
}

/// Lists the execution modules and functions available on the minion
pub trait FunctionCatalog {
    fn list_modules(&self) -> Result<BTreeSet<String>>;

    /// Fully qualified names, e.g. `test.echo`
    fn list_functions(&self, module: &str) -> Result<BTreeSet<String>>;
}

/// Expands states assigned to the minion
pub trait StateTopology {
    /// States assigned by the top file, in top file order
    fn list_top_level_states(&self) -> Result<Vec<String>>;

    /// Every sls id making up `state`, itself included
    fn list_sub_states(&self, state: &str) -> Result<Vec<String>>;
}

/// Renders a test file (templating included) into a data tree
pub trait TestFileRenderer {
    fn render_file(&self, path: &Path) -> Result<Value>;
}

/// Keeps the local copy of master files current
pub trait CacheSync {
    /// Replace the local directory `dest` with a fresh copy of `source`
    /// (a `salt://` URL)
    fn refresh_cache(&self, source: &str, dest: &Path) -> Result<()>;

    /// Cache every file from the master
    fn cache_master(&self) -> Result<()>;
}

/// Everything the engine needs from a minion
pub trait Minion:
    ActionInvoker + FunctionCatalog + StateTopology + TestFileRenderer + CacheSync
{
}

impl<T> Minion for T where
    T: ActionInvoker + FunctionCatalog + StateTopology + TestFileRenderer + CacheSync
{
}
