//! CLI command definitions
//!
//! Defines the clap commands for the saltcheck CLI.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Treat a test id defined in more than one file as an error
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log validator scores and discovery details
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one test given as a JSON object
    ///
    /// Example: saltcheck run-test '{"module_and_function": "test.echo",
    /// "assertion": "assertEqual", "expected-return": "This works!",
    /// "args": ["This works!"]}'
    RunTest {
        /// Test definition as JSON
        test: String,
    },

    /// Run the tests of a state and every state it includes
    RunStateTests {
        /// State name, e.g. apache or apache.config
        state: String,
    },

    /// Run the tests of every state in the highstate
    #[command(alias = "run-topology-tests")]
    RunHighstateTests,

    /// List test files without running them
    ShowTests {
        /// Only this state and the states it includes (default: highstate)
        state: Option<String>,
    },

    /// Copy all files from the master into the minion cache
    UpdateMasterCache,
}
