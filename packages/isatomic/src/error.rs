use std::io;

use thiserror::Error;

use crate::{CpuId, Mode};

/// Errors that can prevent a race from producing a trustworthy measurement.
///
/// Detected tearing is not an error - it is a valid measurement outcome, reported via
/// [`Verdict::Torn`][crate::Verdict::Torn].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system refused to tell us which processors the current thread may use.
    #[error("failed to query processor affinity of the current thread: {source}")]
    AffinityQuery {
        /// The underlying operating system error.
        source: io::Error,
    },

    /// The affinity mask of the current thread is empty, or the caller requested an empty
    /// set of processors.
    #[error("no processors are available to run the test on")]
    NoAllowedCpus,

    /// The caller requested a processor that the current thread is not allowed to run on.
    #[error("processor {cpu} is not in the set of processors allowed for this process")]
    CpuNotAllowed {
        /// The requested processor.
        cpu: CpuId,
    },

    /// A worker thread could not be pinned to its processor. A measurement taken without
    /// pinning is not trustworthy, so the run is aborted.
    #[error("failed to pin worker thread to processor {cpu}: {source}")]
    Pin {
        /// The processor that the worker was supposed to be pinned to.
        cpu: CpuId,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread for processor {cpu}: {source}")]
    Spawn {
        /// The processor that the worker was supposed to run on.
        cpu: CpuId,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// The caller provided a test mode token that is not recognized.
    #[error("'{token}' is not a valid test mode")]
    InvalidMode {
        /// The token as provided by the caller.
        token: String,
    },

    /// The test mode is valid but the current processor (or build target) has no instructions
    /// that can perform a single load/store of the required width.
    #[error(
        "test mode {mode} ({}) is not supported on this processor",
        .mode.description()
    )]
    UnsupportedMode {
        /// The requested test mode.
        mode: Mode,
    },
}

/// A specialized `Result` type for isatomic operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn os_error_is_part_of_message() {
        let error = Error::Pin {
            cpu: 7,
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        let message = error.to_string();
        assert!(message.contains("processor 7"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn unsupported_mode_names_token() {
        let error = Error::UnsupportedMode {
            mode: Mode::Width64Split,
        };

        assert_eq!(
            error.to_string(),
            "test mode 512s (64B cacheline split loads/stores) is not supported on this processor"
        );
    }
}
