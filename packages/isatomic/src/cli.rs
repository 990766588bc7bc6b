//! Command line interface of the `isatomic` tool.

use argh::FromArgs;

use crate::{CpuId, DEFAULT_ITERATIONS, Mode, RunConfig};

/// Tests if 16B/32B/64B wide loads/stores are atomic.
#[derive(Debug, FromArgs)]
#[argh(
    note = "Test modes:
  128:  16B loads/stores
  128u: 16B unaligned loads/stores
  128s: 16B cacheline split loads/stores
  256:  32B loads/stores
  256u: 32B unaligned loads/stores
  256s: 32B cacheline split loads/stores
  512:  64B loads/stores
  512s: 64B cacheline split loads/stores

Not every mode is supported on every processor.
Set RUST_LOG=debug to see what each worker is doing.",
    error_code(1, "Torn loads/stores detected, invalid arguments or system error.")
)]
struct Args {
    /// number of iterations per processor (default 1000000)
    #[argh(option, short = 'i', default = "DEFAULT_ITERATIONS")]
    iterations: u64,

    /// test mode, see below
    #[argh(option, short = 't')]
    mode: Option<Mode>,

    /// only test on these processors, in cpulist format (e.g. 0-3,8); ordered ascending
    #[argh(option, short = 'c', from_str_fn(parse_cpulist))]
    cpus: Option<Vec<CpuId>>,
}

fn parse_cpulist(value: &str) -> Result<Vec<CpuId>, String> {
    cpulist::parse(value).map_err(|e| e.to_string())
}

/// Why the command line did not result in a test run.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Usage {
    /// The user asked for help. The text belongs on standard output and the process should
    /// exit successfully.
    Help(String),

    /// The command line is not valid. Both texts belong on standard error and the process
    /// should exit with status 1.
    Invalid {
        /// What is wrong with the command line.
        message: String,

        /// The full usage text.
        usage: String,
    },
}

/// Parses the command line arguments (excluding the command name itself) into a run
/// configuration.
///
/// # Errors
///
/// Returns [`Usage`] if no test should be run, either because the arguments are invalid or
/// because the user asked for help.
///
/// # Example
///
/// ```
/// use isatomic::Mode;
/// use isatomic::cli::{Usage, parse};
///
/// let config = parse("isatomic", &["-i", "1000", "-t", "128s"]).unwrap();
/// assert_eq!(config.mode(), Mode::Width16Split);
///
/// assert!(matches!(parse("isatomic", &[]), Err(Usage::Invalid { .. })));
/// ```
pub fn parse(command_name: &str, args: &[&str]) -> Result<RunConfig, Usage> {
    let args = Args::from_args(&[command_name], args).map_err(|early_exit| {
        let output = early_exit.output.trim_end().to_owned();

        match early_exit.status {
            Ok(()) => Usage::Help(output),
            Err(()) => Usage::Invalid {
                message: output,
                usage: usage_text(command_name),
            },
        }
    })?;

    let Some(mode) = args.mode else {
        return Err(Usage::Invalid {
            message: "must specify test type (-t)!".to_owned(),
            usage: usage_text(command_name),
        });
    };

    let config = RunConfig::new(mode).with_iterations(args.iterations);

    Ok(match args.cpus {
        Some(cpus) => config.with_cpus(cpus),
        None => config,
    })
}

/// The full usage text, as displayed by `--help`.
#[must_use]
pub fn usage_text(command_name: &str) -> String {
    match Args::from_args(&[command_name], &["--help"]) {
        Ok(_) => String::new(),
        Err(early_exit) => early_exit.output.trim_end().to_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn invalid_message(args: &[&str]) -> String {
        match parse("isatomic", args) {
            Err(Usage::Invalid { message, usage }) => {
                assert!(usage.contains("Usage: isatomic"));
                message
            }
            other => panic!("expected invalid usage, got {other:?}"),
        }
    }

    #[test]
    fn mode_only_uses_defaults() {
        let config = parse("isatomic", &["-t", "128"]).unwrap();

        assert_eq!(config, RunConfig::new(Mode::Width16Aligned));
    }

    #[test]
    fn every_mode_token_is_accepted() {
        for mode in Mode::ALL {
            let token = mode.to_string();
            let config = parse("isatomic", &["-t", &token]).unwrap();

            assert_eq!(config.mode(), mode);
        }
    }

    #[test]
    fn iterations_and_cpus() {
        let config = parse("isatomic", &["-i", "1000", "-t", "256s", "-c", "0-2,5"]).unwrap();

        assert_eq!(
            config,
            RunConfig::new(Mode::Width32Split)
                .with_iterations(1000)
                .with_cpus(vec![0, 1, 2, 5])
        );
    }

    #[test]
    fn long_option_names() {
        let config = parse("isatomic", &["--iterations", "0", "--mode", "512"]).unwrap();

        assert_eq!(config.iterations(), 0);
        assert_eq!(config.mode(), Mode::Width64Aligned);
    }

    #[test]
    fn missing_mode_is_invalid() {
        assert_eq!(
            invalid_message(&["-i", "10"]),
            "must specify test type (-t)!"
        );
    }

    #[test]
    fn unknown_mode_is_invalid() {
        let message = invalid_message(&["-t", "512u"]);

        assert!(message.contains("'512u' is not a valid test mode"), "{message}");
    }

    #[test]
    fn bad_iterations_are_invalid() {
        invalid_message(&["-i", "many", "-t", "128"]);
        invalid_message(&["-i", "-5", "-t", "128"]);
    }

    #[test]
    fn bad_cpulist_is_invalid() {
        invalid_message(&["-t", "128", "-c", "zero"]);
    }

    #[test]
    fn positional_argument_is_invalid() {
        invalid_message(&["-t", "128", "extra"]);
    }

    #[test]
    fn unknown_flag_is_invalid() {
        invalid_message(&["-t", "128", "-x"]);
    }

    #[test]
    fn help_lists_modes() {
        let Err(Usage::Help(text)) = parse("isatomic", &["--help"]) else {
            panic!("expected help");
        };

        for mode in Mode::ALL {
            assert!(text.contains(&format!("{mode}:")), "{mode} missing from help");
        }

        assert_eq!(text, usage_text("isatomic"));
    }

    #[test]
    fn help_describes_modes_like_mode_descriptions() {
        let text = usage_text("isatomic");

        for mode in Mode::ALL {
            let prefix = format!("{mode}:");
            let line = text
                .lines()
                .map(str::trim)
                .find(|line| line.starts_with(&prefix))
                .unwrap_or_else(|| panic!("{mode} missing from help"));

            assert_eq!(
                line.trim_start_matches(&prefix).trim_start(),
                mode.description()
            );
        }
    }

    #[test]
    fn cpus_are_ascending_and_deduplicated() {
        let config = parse("isatomic", &["-t", "128", "-c", "3,1,3,0-1"]).unwrap();

        assert_eq!(config.cpus(), Some(&[0, 1, 3][..]));
    }
}
