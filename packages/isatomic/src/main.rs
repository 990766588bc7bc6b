#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the isatomic tool.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::env;
use std::io;
use std::process::ExitCode;

use isatomic::cli::{self, Usage};
use isatomic::{Verdict, run};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const FALLBACK_COMMAND_NAME: &str = "isatomic";

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    // Standard output is reserved for the report lines.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let env_args: Vec<String> = env::args().collect();
    let str_args: Vec<&str> = env_args.iter().map(String::as_str).collect();

    let command_name = str_args.first().copied().unwrap_or(FALLBACK_COMMAND_NAME);

    let config = match cli::parse(command_name, str_args.get(1..).unwrap_or(&[])) {
        Ok(config) => config,
        Err(Usage::Help(text)) => {
            println!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(Usage::Invalid { message, usage }) => {
            eprintln!("{message}");
            eprintln!();
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
        Err(other) => {
            eprintln!("{other:?}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(classification) => {
            for observation in classification.observations() {
                println!("{observation}");
            }

            match classification.verdict() {
                Verdict::Atomic => ExitCode::SUCCESS,
                Verdict::Torn => ExitCode::FAILURE,
            }
        }
        Err(e) => {
            eprintln!("{command_name}: {e}");
            ExitCode::FAILURE
        }
    }
}
