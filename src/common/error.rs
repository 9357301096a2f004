//! Error types for saltcheck
//!
//! Only environment problems are errors. Test outcomes (pass, fail, invalid
//! test) are reported as data and never surface through this type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for saltcheck
#[derive(Error, Debug)]
pub enum Error {
    // === Host Collaborator Errors ===
    #[error("salt-call not found. Install salt-minion or set [salt_call] path in the config")]
    SaltCallNotFound,

    #[error("Call to '{function}' failed: {message}")]
    Collaborator { function: String, message: String },

    #[error("Unexpected output from '{function}': {message}")]
    UnexpectedOutput { function: String, message: String },

    // === Test File Errors ===
    #[error("Failed to load test file '{}': {error}", path.display())]
    TestFile { path: PathBuf, error: String },

    #[error("Test '{name}' in '{}' is already defined by an earlier test file", path.display())]
    DuplicateTest { name: String, path: PathBuf },

    #[error("Invalid test definition: {0}")]
    InvalidDefinition(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a collaborator failure for a host function call
    pub fn collaborator(function: &str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Create an unexpected output error for a host function call
    pub fn unexpected_output(function: &str, message: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Create a test file load error
    pub fn test_file(path: &std::path::Path, error: impl ToString) -> Self {
        Self::TestFile {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}
