//! End-to-end tests for the test engine
//!
//! These tests drive `SaltCheck` against a fake minion:
//! 1. The fixture tree under `tests/fixtures/master` plays the master file server
//! 2. Caching copies it into a temporary minion cache
//! 3. Functions return canned values, everything else fails like salt would

use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use saltcheck::common::config::MergePolicy;
use saltcheck::host::{
    ActionInvoker, CacheSync, FunctionCatalog, StateTopology, TestFileRenderer, YamlRenderer,
};
use saltcheck::testing::{EngineSettings, TestRecord, TestSuite, NO_TESTS_FOUND};
use saltcheck::{Error, Result, SaltCheck, TestResult};

/// Minion backed by the fixture tree and canned function returns
struct FakeMinion {
    /// Directory standing in for the master's file roots
    master: PathBuf,
    /// Local cache root, `<cachedir>/files/base`
    cache: PathBuf,
    top: Vec<String>,
    sls: HashMap<String, Vec<String>>,
    returns: HashMap<String, Value>,
    invocations: RefCell<Vec<(String, Vec<Value>)>>,
    refreshes: RefCell<Vec<String>>,
    module_lookups: Cell<usize>,
    cache_master_calls: Cell<usize>,
}

impl FakeMinion {
    fn new(cache: &Path) -> Self {
        let master = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("master");

        let sls = HashMap::from([
            ("apache".to_string(), strings(&["apache", "apache.mods"])),
            ("apache.mods".to_string(), strings(&["apache.mods"])),
            ("ntp".to_string(), strings(&["ntp"])),
            ("postfix".to_string(), strings(&["postfix"])),
        ]);

        let returns = HashMap::from([
            ("pkg.version".to_string(), json!("2.4.41-4ubuntu3")),
            ("service.status".to_string(), json!(true)),
            ("config.get".to_string(), json!(80)),
            (
                "user.info".to_string(),
                json!({"name": "www-data", "shell": "/usr/sbin/nologin"}),
            ),
            (
                "cmd.run".to_string(),
                json!(" rewrite_module (shared)\n ssl_module (shared)"),
            ),
            ("ntp.get_servers".to_string(), json!(["0.pool.ntp.org"])),
        ]);

        Self {
            master,
            cache: cache.to_path_buf(),
            top: strings(&["apache", "ntp", "postfix", "legacy"]),
            sls,
            returns,
            invocations: RefCell::new(Vec::new()),
            refreshes: RefCell::new(Vec::new()),
            module_lookups: Cell::new(0),
            cache_master_calls: Cell::new(0),
        }
    }

    fn invoked(&self, function: &str) -> Vec<Vec<Value>> {
        self.invocations
            .borrow()
            .iter()
            .filter(|(f, _)| f == function)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

impl ActionInvoker for FakeMinion {
    fn invoke(&self, function: &str, args: &[Value], _kwargs: &Map<String, Value>) -> Result<Value> {
        self.invocations
            .borrow_mut()
            .push((function.to_string(), args.to_vec()));

        if let Some(value) = self.returns.get(function) {
            return Ok(value.clone());
        }
        match function {
            "test.echo" => Ok(args.first().cloned().unwrap_or(Value::Null)),
            "test.arg" => Err(Error::InvalidDefinition("argument cannot be sent".to_string())),
            _ => Err(Error::collaborator(function, "minion did not return")),
        }
    }
}

impl FunctionCatalog for FakeMinion {
    fn list_modules(&self) -> Result<BTreeSet<String>> {
        self.module_lookups.set(self.module_lookups.get() + 1);
        Ok(["cmd", "config", "ntp", "pkg", "service", "test", "user"]
            .into_iter()
            .map(String::from)
            .collect())
    }

    fn list_functions(&self, module: &str) -> Result<BTreeSet<String>> {
        let known = [
            "cmd.run",
            "config.get",
            "ntp.get_servers",
            "pkg.version",
            "service.restart",
            "service.status",
            "test.arg",
            "test.echo",
            "user.info",
        ];
        let prefix = format!("{module}.");
        Ok(known
            .into_iter()
            .filter(|f| f.starts_with(&prefix))
            .map(String::from)
            .collect())
    }
}

impl StateTopology for FakeMinion {
    fn list_top_level_states(&self) -> Result<Vec<String>> {
        Ok(self.top.clone())
    }

    fn list_sub_states(&self, state: &str) -> Result<Vec<String>> {
        self.sls
            .get(state)
            .cloned()
            .ok_or_else(|| Error::collaborator("state.show_sls", format!("No matching sls found for '{state}'")))
    }
}

impl TestFileRenderer for FakeMinion {
    fn render_file(&self, path: &Path) -> Result<Value> {
        YamlRenderer.render_file(path)
    }
}

impl CacheSync for FakeMinion {
    fn refresh_cache(&self, source: &str, dest: &Path) -> Result<()> {
        self.refreshes.borrow_mut().push(source.to_string());
        let relative = source.trim_start_matches("salt://");
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        copy_tree(&self.master.join(relative), dest)
    }

    fn cache_master(&self) -> Result<()> {
        self.cache_master_calls.set(self.cache_master_calls.get() + 1);
        copy_tree(&self.master, &self.cache)
    }
}

/// Test context with a temporary minion cache
struct TestContext {
    _temp_dir: TempDir,
    cache: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = temp_dir.path().join("files").join("base");
        Self {
            _temp_dir: temp_dir,
            cache,
        }
    }

    fn settings(&self, merge: MergePolicy, auto_update: bool) -> EngineSettings {
        EngineSettings {
            search_roots: vec![self.cache.clone()],
            dir_name: "saltcheck-tests".to_string(),
            extension: "tst".to_string(),
            merge,
            auto_update_master_cache: auto_update,
        }
    }

    /// Engine over a cache that already holds the master's files
    fn engine(&self) -> SaltCheck<FakeMinion> {
        SaltCheck::new(FakeMinion::new(&self.cache), self.settings(MergePolicy::Permissive, true))
            .expect("Failed to create engine")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn record(value: Value) -> TestRecord {
    TestRecord::from_value(value).expect("test definition must be an object")
}

// ============================================================================
// Single tests
// ============================================================================

#[test]
fn test_single_echo_passes() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let result = engine
        .run_single_test(
            "echo",
            &record(json!({
                "module_and_function": "test.echo",
                "args": ["hi"],
                "assertion": "assertEqual",
                "expected-return": "hi"
            })),
        )
        .unwrap();

    assert_eq!(result, TestResult::Pass);
    assert_eq!(engine.minion().invoked("test.echo"), vec![vec![json!("hi")]]);
}

#[test]
fn test_single_echo_mismatch_fails_with_both_values() {
    let ctx = TestContext::new();
    let mut minion = FakeMinion::new(&ctx.cache);
    minion.returns.insert("test.echo".to_string(), json!("bye"));
    let mut engine = SaltCheck::new(minion, ctx.settings(MergePolicy::Permissive, false)).unwrap();

    let result = engine
        .run_single_test(
            "echo",
            &record(json!({
                "module_and_function": "test.echo",
                "args": ["hi"],
                "assertion": "assertEqual",
                "expected-return": "hi"
            })),
        )
        .unwrap();

    assert_eq!(result.to_string(), "Fail: hi is not equal to bye");
}

#[test]
fn test_single_incomplete_definition_is_not_executed() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let result = engine
        .run_single_test(
            "incomplete",
            &record(json!({"module_and_function": "test.echo", "assertion": "assertEqual"})),
        )
        .unwrap();

    assert_eq!(result.to_string(), "Fail - invalid test");
    assert!(engine.minion().invoked("test.echo").is_empty());
}

#[test]
fn test_single_invoker_failure_is_an_error() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let err = engine
        .run_single_test(
            "restart",
            &record(json!({
                "module_and_function": "service.restart",
                "args": "apache2",
                "assertion": "assertTrue"
            })),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Collaborator { ref function, .. } if function == "service.restart"));
}

#[test]
fn test_single_kwargs_not_a_mapping_is_invalid() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();
    let bad_kwargs = record(json!({
        "module_and_function": "test.echo",
        "args": ["hi"],
        "kwargs": ["a"],
        "assertion": "assertEqual",
        "expected-return": "hi"
    }));

    let result = engine.run_single_test("bad-kwargs", &bad_kwargs).unwrap();
    assert_eq!(result.to_string(), "Fail - kwargs must be a mapping");
    assert!(engine.minion().invoked("test.echo").is_empty());

    let mut suite = TestSuite::new();
    suite.insert("bad-kwargs".to_string(), bad_kwargs);
    let report = engine.aggregate(&[("web".to_string(), suite)]).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value[0]["web"]["bad-kwargs"], json!("Fail - kwargs must be a mapping"));
    assert_eq!(report.summary.failed, 1);
}

#[test]
fn test_single_definition_refused_by_minion_is_invalid() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let result = engine
        .run_single_test(
            "arg",
            &record(json!({
                "module_and_function": "test.arg",
                "args": ["name=apache2"],
                "assertion": "assertNotEmpty"
            })),
        )
        .unwrap();

    assert_eq!(result.to_string(), "Fail - argument cannot be sent");
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_sorts_states_and_counts_outcomes() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let mut mixed = TestSuite::new();
    mixed.insert(
        "echo".to_string(),
        record(json!({
            "module_and_function": "test.echo",
            "args": ["hi"],
            "assertion": "assertEqual",
            "expected-return": "hi"
        })),
    );
    mixed.insert(
        "incomplete".to_string(),
        record(json!({"module_and_function": "test.echo", "assertion": "assertEqual"})),
    );
    let suites = vec![
        ("zeta".to_string(), TestSuite::new()),
        ("alpha".to_string(), mixed),
    ];

    let report = engine.aggregate(&suites).unwrap();

    let states: Vec<&str> = report.states.iter().map(|s| s.state.as_str()).collect();
    assert_eq!(states, vec!["alpha", "zeta"]);

    let alpha = report.state("alpha").unwrap();
    assert_eq!(alpha.get("echo"), Some(&TestResult::Pass));
    assert_eq!(alpha.get("incomplete"), Some(&TestResult::invalid()));
    assert!(report.state("zeta").unwrap().results.is_empty());

    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.missing_tests, 1);
}

// ============================================================================
// State runs
// ============================================================================

#[test]
fn test_state_run_includes_sub_states() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let report = engine.run_state_tests("apache").unwrap();

    let states: Vec<&str> = report.states.iter().map(|s| s.state.as_str()).collect();
    assert_eq!(states, vec!["apache", "apache.mods"]);

    let apache = report.state("apache").unwrap();
    let names: Vec<&str> = apache.results.iter().map(|(n, _)| n.as_str()).collect();
    // Files directly in the test directory come before nested ones
    assert_eq!(
        names,
        vec!["apache-installed", "apache-running", "apache-port", "apache-user", "apache-broken"]
    );
    assert_eq!(apache.get("apache-port"), Some(&TestResult::Pass));
    assert_eq!(apache.get("apache-user"), Some(&TestResult::Pass));
    assert_eq!(apache.get("apache-broken"), Some(&TestResult::invalid()));

    assert_eq!(report.summary.passed, 5);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.missing_tests, 0);
    assert!(!report.all_passed());
}

#[test]
fn test_string_args_are_split_on_whitespace() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    engine.run_state_tests("apache.mods").unwrap();

    assert_eq!(
        engine.minion().invoked("cmd.run"),
        vec![vec![json!("apachectl"), json!("-M")]]
    );
}

#[test]
fn test_test_directories_are_refreshed_before_reading() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    engine.run_state_tests("apache").unwrap();

    let refreshes = engine.minion().refreshes.borrow().clone();
    assert_eq!(
        refreshes,
        vec!["salt://apache/saltcheck-tests", "salt://apache/mods/saltcheck-tests"]
    );
}

#[test]
fn test_uncached_tests_are_reported_missing() {
    let ctx = TestContext::new();
    let mut engine = SaltCheck::new(
        FakeMinion::new(&ctx.cache),
        ctx.settings(MergePolicy::Permissive, false),
    )
    .unwrap();

    let report = engine.run_state_tests("apache").unwrap();

    assert_eq!(report.summary.passed, 0);
    assert_eq!(report.summary.missing_tests, 2);
    assert_eq!(engine.minion().cache_master_calls.get(), 0);
}

#[test]
fn test_auto_update_caches_master_once() {
    let ctx = TestContext::new();
    let engine = ctx.engine();
    assert_eq!(engine.minion().cache_master_calls.get(), 1);

    engine.update_master_cache().unwrap();
    assert_eq!(engine.minion().cache_master_calls.get(), 2);
}

// ============================================================================
// Highstate runs
// ============================================================================

#[test]
fn test_highstate_run_reports_every_state_once() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let report = engine.run_topology_tests().unwrap();

    let states: Vec<&str> = report.states.iter().map(|s| s.state.as_str()).collect();
    assert_eq!(states, vec!["apache", "apache.mods", "legacy", "ntp", "postfix"]);

    // A test id defined in two files runs once
    assert_eq!(report.state("ntp").unwrap().results.len(), 1);
    assert!(report.state("postfix").unwrap().results.is_empty());
    assert!(report.state("legacy").unwrap().results.is_empty());

    assert_eq!(report.summary.passed, 6);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.missing_tests, 2);
}

#[test]
fn test_validator_lookups_are_shared_across_states() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    engine.run_topology_tests().unwrap();

    assert_eq!(engine.minion().module_lookups.get(), 1);
}

#[test]
fn test_highstate_report_json_shape() {
    let ctx = TestContext::new();
    let mut engine = ctx.engine();

    let report = engine.run_topology_tests().unwrap();
    let value = serde_json::to_value(&report).unwrap();
    let entries = value.as_array().unwrap();

    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["apache"]["apache-broken"], json!("Fail - invalid test"));
    assert_eq!(entries[1]["apache.mods"]["rewrite-enabled"], json!("Pass"));
    assert_eq!(entries[2]["legacy"], json!({}));
    assert_eq!(
        entries[5],
        json!({"TEST RESULTS": {"Passed": 6, "Failed": 1, "Missing Tests": 2}})
    );
}

#[test]
fn test_strict_merge_rejects_duplicate_test_ids() {
    let ctx = TestContext::new();
    let mut engine = SaltCheck::new(
        FakeMinion::new(&ctx.cache),
        ctx.settings(MergePolicy::Strict, true),
    )
    .unwrap();

    let err = engine.run_state_tests("ntp").unwrap_err();

    assert!(matches!(err, Error::DuplicateTest { ref name, .. } if name == "ntp-servers"));
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_list_tests_without_running_them() {
    let ctx = TestContext::new();
    let engine = ctx.engine();

    let listing = engine.list_tests(None).unwrap();

    assert_eq!(
        listing["apache"],
        vec!["saltcheck-tests/pkg.tst", "saltcheck-tests/config/config.tst"]
    );
    assert_eq!(listing["apache.mods"], vec!["saltcheck-tests/mods.tst"]);
    assert_eq!(listing["postfix"], vec![NO_TESTS_FOUND]);
    assert_eq!(listing["legacy"], vec![NO_TESTS_FOUND]);

    let mut ntp = listing["ntp"].clone();
    ntp.sort();
    assert_eq!(
        ntp,
        vec!["saltcheck-tests/servers-override.tst", "saltcheck-tests/servers.tst"]
    );

    assert!(engine.minion().invocations.borrow().is_empty());
}

#[test]
fn test_list_tests_for_one_state() {
    let ctx = TestContext::new();
    let engine = ctx.engine();

    let listing = engine.list_tests(Some("apache.mods")).unwrap();

    assert_eq!(listing.len(), 1);
    assert_eq!(listing["apache.mods"], vec!["saltcheck-tests/mods.tst"]);
}
