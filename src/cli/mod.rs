//! CLI command handling
//!
//! Builds an engine against the local minion, dispatches commands to it and
//! formats the output.

use colored::Colorize;
use std::collections::BTreeMap;

use crate::commands::{Commands, GlobalOptions, OutputFormat};
use crate::common::config::{Config, MergePolicy};
use crate::common::{Error, Result};
use crate::host::SaltCall;
use crate::testing::{EngineSettings, RunReport, SaltCheck, TestRecord, TestResult, NO_TESTS_FOUND};

/// Dispatch a CLI command
///
/// Returns whether every executed test passed.
pub fn dispatch(command: Commands, options: &GlobalOptions) -> Result<bool> {
    let mut config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if options.strict {
        config.tests.merge = MergePolicy::Strict;
    }

    let minion = SaltCall::from_config(&config)?;
    let mut engine = SaltCheck::new(minion, EngineSettings::from_config(&config))?;

    match command {
        Commands::RunTest { test } => {
            let value: serde_json::Value = serde_json::from_str(&test)?;
            let record = TestRecord::from_value(value).ok_or_else(|| {
                Error::InvalidDefinition("test must be a JSON object".to_string())
            })?;

            let result = engine.run_single_test("run-test", &record)?;
            match options.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => println!("{}", format_result(&result)),
            }
            Ok(result.is_pass())
        }

        Commands::RunStateTests { state } => {
            let report = engine.run_state_tests(&state)?;
            print_report(&report, options.output)?;
            Ok(report.all_passed())
        }

        Commands::RunHighstateTests => {
            let report = engine.run_topology_tests()?;
            print_report(&report, options.output)?;
            Ok(report.all_passed())
        }

        Commands::ShowTests { state } => {
            let listing = engine.list_tests(state.as_deref())?;
            print_listing(&listing, options.output)?;
            Ok(true)
        }

        Commands::UpdateMasterCache => {
            engine.update_master_cache()?;
            println!("Master cache updated");
            Ok(true)
        }
    }
}

fn format_result(result: &TestResult) -> String {
    match result {
        TestResult::Pass => format!("{} {}", "✓".green(), result),
        _ => format!("{} {}", "✗".red(), result.to_string().red()),
    }
}

fn print_report(report: &RunReport, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for state in &report.states {
        println!("\n{}", state.state.cyan().bold());
        if state.results.is_empty() {
            println!("  {}", NO_TESTS_FOUND.yellow());
            continue;
        }
        for (name, result) in &state.results {
            println!("  {:<40} {}", name, format_result(result));
        }
    }

    let summary = &report.summary;
    let passed = format!("Passed: {}", summary.passed);
    let failed = format!("Failed: {}", summary.failed);
    let missing = format!("Missing Tests: {}", summary.missing_tests);
    println!(
        "\n{} {}, {}, {}\n",
        "TEST RESULTS".bold(),
        passed.green(),
        if summary.failed > 0 { failed.red() } else { failed.normal() },
        if summary.missing_tests > 0 { missing.yellow() } else { missing.normal() },
    );
    Ok(())
}

fn print_listing(listing: &BTreeMap<String, Vec<String>>, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        let wrapped = BTreeMap::from([("Tests", listing)]);
        println!("{}", serde_json::to_string_pretty(&wrapped)?);
        return Ok(());
    }

    for (state, tests) in listing {
        println!("{}", state.cyan().bold());
        for test in tests {
            println!("  {test}");
        }
    }
    Ok(())
}
