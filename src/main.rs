//! saltcheck - unit-test like checks for salt states
//!
//! Runs the tests kept in each state's `saltcheck-tests` directory against
//! the local minion and reports pass/fail per state.

use clap::Parser;
use saltcheck::commands::{Commands, GlobalOptions};
use saltcheck::{cli, common::logging};

#[derive(Parser)]
#[command(name = "saltcheck", about = "Run declarative tests for salt states")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.options.verbose);

    match cli::dispatch(cli.command, &cli.options) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
