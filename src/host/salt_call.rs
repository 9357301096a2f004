//! Minion access through `salt-call`
//!
//! Each collaborator call runs `salt-call --out=json <function> <args...>`
//! and reads the `local` key of the JSON document it prints.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{ActionInvoker, CacheSync, FunctionCatalog, StateTopology, TestFileRenderer, YamlRenderer};
use crate::common::config::{Config, RendererKind};
use crate::common::paths::BASE_ENVIRONMENT;
use crate::common::{Error, Result};

/// Key salt-call uses for the local minion's return
const LOCAL_KEY: &str = "local";

/// Key carrying the sls id in low state chunks
const SLS_KEY: &str = "__sls__";

/// A minion reached by running salt-call locally
#[derive(Debug, Clone)]
pub struct SaltCall {
    program: PathBuf,
    extra_args: Vec<String>,
    environments: Vec<String>,
    renderer: RendererKind,
}

impl SaltCall {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            environments: vec![BASE_ENVIRONMENT.to_string()],
            renderer: RendererKind::Salt,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut environments = Vec::new();
        if let Some(env) = config.minion.environment.as_deref().filter(|e| !e.is_empty()) {
            environments.push(env.to_string());
        }
        if !environments.iter().any(|e| e == BASE_ENVIRONMENT) {
            environments.push(BASE_ENVIRONMENT.to_string());
        }

        Ok(Self {
            program: config.salt_call_path()?,
            extra_args: config.salt_call.args.clone(),
            environments,
            renderer: config.salt_call.renderer,
        })
    }

    /// Run one function and return its decoded result
    pub fn call(&self, function: &str, args: &[String]) -> Result<Value> {
        tracing::debug!(function, ?args, "salt-call");

        let output = Command::new(&self.program)
            .args(&self.extra_args)
            .arg("--out=json")
            .arg("--log-level=quiet")
            .arg(function)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::collaborator(
                    function,
                    format!("failed to run {}: {e}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(Error::collaborator(function, message));
        }

        parse_output(function, &output.stdout)
    }
}

/// Format a value as a salt CLI argument
///
/// Text is passed through, everything else as JSON which salt reads as YAML.
/// salt-call YAML-loads every argument, so text such as `42` or `True`
/// reaches the function as a number or a boolean, not as a string.
fn format_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether salt-call would read `arg` as `name=value` rather than as a
/// positional argument
fn looks_like_kwarg(arg: &str) -> bool {
    let Some((name, value)) = arg.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    let starts_like_name = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    starts_like_name
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && !value.starts_with('=')
}

fn parse_output(function: &str, stdout: &[u8]) -> Result<Value> {
    let mut document: Value = serde_json::from_slice(stdout)
        .map_err(|e| Error::unexpected_output(function, e.to_string()))?;
    document
        .get_mut(LOCAL_KEY)
        .map(Value::take)
        .ok_or_else(|| Error::unexpected_output(function, "no 'local' key in output"))
}

fn string_set(function: &str, returned: Value) -> Result<BTreeSet<String>> {
    match returned {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()),
        other => Err(Error::unexpected_output(
            function,
            format!("expected a list, got {other}"),
        )),
    }
}

/// Collect unique sls ids from `state.show_low_sls` chunks
///
/// Salt reports render failures as a list of strings instead of chunks.
fn sls_ids(function: &str, returned: Value) -> Result<Vec<String>> {
    let chunks = match returned {
        Value::Array(chunks) => chunks,
        other => {
            return Err(Error::unexpected_output(function, format!("expected a list, got {other}")))
        }
    };

    let mut ids: Vec<String> = Vec::new();
    for chunk in &chunks {
        match chunk {
            Value::String(message) => return Err(Error::collaborator(function, message.clone())),
            Value::Object(fields) => {
                if let Some(sls) = fields.get(SLS_KEY).and_then(Value::as_str) {
                    if !ids.iter().any(|id| id == sls) {
                        ids.push(sls.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    Ok(ids)
}

/// Collect top file states for the given environments, in order
fn top_states(function: &str, returned: Value, environments: &[String]) -> Result<Vec<String>> {
    let by_env = match returned {
        Value::Object(by_env) => by_env,
        other => {
            return Err(Error::unexpected_output(
                function,
                format!("expected a mapping, got {other}"),
            ))
        }
    };

    let mut states: Vec<String> = Vec::new();
    for env in environments {
        let Some(Value::Array(entries)) = by_env.get(env) else {
            continue;
        };
        // Entries are state names, or single-key match options
        for state in entries.iter().filter_map(Value::as_str) {
            if !states.iter().any(|s| s == state) {
                states.push(state.to_string());
            }
        }
    }
    Ok(states)
}

impl ActionInvoker for SaltCall {
    fn invoke(&self, function: &str, args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
        if let Some(arg) = args.iter().filter_map(Value::as_str).find(|a| looks_like_kwarg(a)) {
            return Err(Error::InvalidDefinition(format!(
                "positional argument '{arg}' would be read as a keyword argument by salt-call, use kwargs"
            )));
        }

        let mut cli_args: Vec<String> = args.iter().map(format_arg).collect();
        cli_args.extend(kwargs.iter().map(|(key, value)| format!("{key}={}", format_arg(value))));
        self.call(function, &cli_args)
    }
}

impl FunctionCatalog for SaltCall {
    fn list_modules(&self) -> Result<BTreeSet<String>> {
        let function = "sys.list_modules";
        string_set(function, self.call(function, &[])?)
    }

    fn list_functions(&self, module: &str) -> Result<BTreeSet<String>> {
        let function = "sys.list_functions";
        string_set(function, self.call(function, &[module.to_string()])?)
    }
}

impl StateTopology for SaltCall {
    fn list_top_level_states(&self) -> Result<Vec<String>> {
        let function = "state.show_top";
        top_states(function, self.call(function, &[])?, &self.environments)
    }

    fn list_sub_states(&self, state: &str) -> Result<Vec<String>> {
        let function = "state.show_low_sls";
        sls_ids(function, self.call(function, &[state.to_string()])?)
    }
}

impl TestFileRenderer for SaltCall {
    fn render_file(&self, path: &Path) -> Result<Value> {
        match self.renderer {
            RendererKind::Yaml => YamlRenderer.render_file(path),
            RendererKind::Salt => self
                .call("slsutil.renderer", &[path.display().to_string()])
                .map_err(|e| Error::test_file(path, e)),
        }
    }
}

impl CacheSync for SaltCall {
    fn refresh_cache(&self, source: &str, dest: &Path) -> Result<()> {
        let function = "cp.get_dir";
        let parent = dest
            .parent()
            .ok_or_else(|| Error::collaborator(function, format!("no parent for {}", dest.display())))?;

        match std::fs::remove_dir_all(dest) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.call(function, &[source.to_string(), parent.display().to_string()])?;
        Ok(())
    }

    fn cache_master(&self) -> Result<()> {
        self.call("cp.cache_master", &[])?;
        Ok(())
    }
}
