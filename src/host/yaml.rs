//! Local YAML renderer for hosts without the salt renderer

use serde_json::Value;
use std::path::Path;

use super::TestFileRenderer;
use crate::common::{Error, Result};

/// Parses test files as plain YAML, without templating
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlRenderer;

impl TestFileRenderer for YamlRenderer {
    fn render_file(&self, path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::test_file(path, e))?;
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str(&content).map_err(|e| Error::test_file(path, e))
    }
}
