//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{self, config_path};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Minion cache settings
    #[serde(default)]
    pub minion: MinionConfig,

    /// Test discovery and loading settings
    #[serde(default)]
    pub tests: TestsConfig,

    /// salt-call backend settings
    #[serde(default)]
    pub salt_call: SaltCallConfig,
}

/// How test files defining the same test name are combined
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// A later file replaces an earlier test of the same name
    #[default]
    Permissive,
    /// A repeated test name is a load error
    Strict,
}

/// Which collaborator renders test files
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// `slsutil.renderer` on the minion (jinja + yaml)
    #[default]
    Salt,
    /// Plain YAML parsed locally, no templating
    Yaml,
}

/// Minion cache settings
#[derive(Debug, Deserialize)]
pub struct MinionConfig {
    /// Minion cache directory
    #[serde(default = "default_cachedir")]
    pub cachedir: PathBuf,

    /// Salt environment searched before `base`
    #[serde(default)]
    pub environment: Option<String>,
}

impl Default for MinionConfig {
    fn default() -> Self {
        Self {
            cachedir: default_cachedir(),
            environment: None,
        }
    }
}

fn default_cachedir() -> PathBuf {
    PathBuf::from("/var/cache/salt/minion")
}

/// Test discovery and loading settings
#[derive(Debug, Deserialize)]
pub struct TestsConfig {
    /// Name of the per-state test directory
    #[serde(default = "default_dir_name")]
    pub dir_name: String,

    /// Extension of test definition files, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Duplicate test name handling
    #[serde(default)]
    pub merge: MergePolicy,

    /// Cache all master files once when the engine starts
    #[serde(default)]
    pub auto_update_master_cache: bool,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            dir_name: default_dir_name(),
            extension: default_extension(),
            merge: MergePolicy::default(),
            auto_update_master_cache: false,
        }
    }
}

fn default_dir_name() -> String {
    "saltcheck-tests".to_string()
}
fn default_extension() -> String {
    "tst".to_string()
}

/// salt-call backend settings
#[derive(Debug, Deserialize, Default)]
pub struct SaltCallConfig {
    /// Path to salt-call, searched in PATH when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Extra arguments placed before the function name (e.g. `--local`)
    #[serde(default)]
    pub args: Vec<String>,

    /// Test file renderer
    #[serde(default)]
    pub renderer: RendererKind,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        if config.tests.dir_name.is_empty() || config.tests.extension.is_empty() {
            return Err(Error::Config(
                "[tests] dir_name and extension must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Local fileserver cache roots to search, in priority order
    pub fn search_roots(&self) -> Vec<PathBuf> {
        paths::state_search_roots(&self.minion.cachedir, self.minion.environment.as_deref())
    }

    /// Locate the salt-call executable
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn salt_call_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.salt_call.path {
            return Ok(path.clone());
        }
        which::which("salt-call").map_err(|_| Error::SaltCallNotFound)
    }
}
