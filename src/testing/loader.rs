//! Test file loading
//!
//! Renders each file through the host and merges the resulting tables into
//! one suite. Any file that fails to render or has the wrong shape fails the
//! whole load.

use serde_json::Value;
use std::path::{Path, PathBuf};

use super::config::{TestRecord, TestSuite};
use crate::common::config::MergePolicy;
use crate::common::{Error, Result};
use crate::host::TestFileRenderer;

pub struct TestFileLoader<'a, R: TestFileRenderer + ?Sized> {
    renderer: &'a R,
    policy: MergePolicy,
}

impl<'a, R: TestFileRenderer + ?Sized> TestFileLoader<'a, R> {
    pub fn new(renderer: &'a R, policy: MergePolicy) -> Self {
        Self { renderer, policy }
    }

    /// Load files in the given order; later files replace earlier tests
    pub fn load(&self, paths: &[PathBuf]) -> Result<TestSuite> {
        let mut suite = TestSuite::new();
        for path in paths {
            self.load_file(path, &mut suite)?;
        }
        Ok(suite)
    }

    fn load_file(&self, path: &Path, suite: &mut TestSuite) -> Result<()> {
        let rendered = self.renderer.render_file(path)?;
        tracing::debug!(file = %path.display(), "rendered test file");

        let tests = match rendered {
            Value::Null => return Ok(()),
            Value::Object(tests) => tests,
            other => {
                return Err(Error::test_file(
                    path,
                    format!("expected a mapping of test ids, got {other}"),
                ))
            }
        };

        for (name, value) in tests {
            let record = TestRecord::from_value(value).ok_or_else(|| {
                Error::test_file(path, format!("test '{name}' is not a mapping"))
            })?;
            suite.merge(name, record, path, self.policy)?;
        }
        Ok(())
    }
}
