#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Tests whether wide (16, 32 or 64 byte) memory loads and stores are atomic on the current
//! hardware.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that provides mechanisms for
//! high-performance hardware-aware programming in Rust.
//!
//! # Why should one care?
//!
//! Lock-free data structures sometimes rely on a wide store being observed either completely or
//! not at all - for example, a 16-byte descriptor that is published with one vector store and
//! read with one vector load, without a compare-and-swap. Whether that holds depends on the
//! processor, on the width of the access and on whether the access is aligned or straddles a
//! cache line. Architecture manuals are often vague about it, so the only way to be sure is to
//! measure.
//!
//! # How does it work?
//!
//! One worker thread is started for every processor and pinned to it. All workers share one
//! piece of memory and, released at the same instant by a spinning barrier, each of them
//! repeatedly loads a fixed byte range of it and then stores either "all bits clear" or
//! "all bits set" into the same range.
//!
//! From every load, the high bit of each lane is extracted into a lane mask. If the loads and
//! stores are atomic, the only possible masks are all-zeroes and all-ones. Any other mask means a
//! load observed half of one store and half of another - a torn load/store.
//!
//! ```no_run
//! use isatomic::{Mode, RunConfig, Verdict};
//!
//! let config = RunConfig::new(Mode::Width16Split).with_iterations(100_000);
//! let classification = isatomic::run(&config)?;
//!
//! for observation in classification.observations() {
//!     println!("{observation}");
//! }
//!
//! if classification.verdict() == Verdict::Torn {
//!     println!("16-byte cache line split loads/stores are not atomic here");
//! }
//! # Ok::<(), isatomic::Error>(())
//! ```
//!
//! # Test modes
//!
//! | mode   | width    | placement                                |
//! |--------|----------|------------------------------------------|
//! | `128`  | 16 bytes | aligned                                  |
//! | `128u` | 16 bytes | unaligned, within one cache line         |
//! | `128s` | 16 bytes | straddling a cache line boundary         |
//! | `256`  | 32 bytes | aligned                                  |
//! | `256u` | 32 bytes | unaligned, within one cache line         |
//! | `256s` | 32 bytes | straddling a cache line boundary         |
//! | `512`  | 64 bytes | aligned                                  |
//! | `512s` | 64 bytes | straddling a cache line boundary         |
//!
//! On x86-64, the 32-byte modes require AVX and the 64-byte modes require AVX-512F. On AArch64,
//! only the 16-byte modes exist. Use [`is_supported()`] to check.
//!
//! # Platform support
//!
//! Processor enumeration and pinning are only implemented on Linux. On other operating systems,
//! [`run()`] fails with [`Error::AffinityQuery`] instead of producing an unpinned (and therefore
//! untrustworthy) measurement.

mod access;
mod barrier;
mod classify;
pub mod cli;
mod config;
mod error;
mod harness;
mod histogram;
mod mode;
mod pal;
mod primitive_types;
mod scratch;
mod tally;
mod topology;

pub use access::is_supported;
pub use classify::*;
pub use config::*;
pub use error::*;
pub use histogram::*;
pub use mode::{CACHE_LINE_BYTES, Mode, Placement, SCRATCH_REGION_BYTES, Width};
pub use primitive_types::*;
pub use scratch::*;
pub use tally::*;
pub use topology::allowed_cpus;

use tracing::debug;

use crate::harness::RaceHarness;
use crate::pal::BindingsFacade;

/// Runs the race described by `config` and classifies what the workers observed.
///
/// The calling thread takes part in the race as the worker for the first processor and stays
/// pinned to that processor afterwards.
///
/// # Errors
///
/// Returns an error if the processors cannot be enumerated or pinned to, if the configuration
/// requests processors that are not available, or if the mode is not supported on this
/// processor. Torn loads/stores are not an error - see [`Classification::verdict()`].
pub fn run(config: &RunConfig) -> Result<Classification> {
    run_with(&BindingsFacade::target(), config)
}

fn run_with(bindings: &BindingsFacade, config: &RunConfig) -> Result<Classification> {
    let mode = config.mode();

    // Before we start pinning anything - pinning the calling thread changes what this returns.
    let allowed = topology::allowed_cpus_with(bindings)?;
    let cpus = topology::select(allowed, config.cpus())?;

    debug!(
        %mode,
        iterations = config.iterations(),
        cpus = %cpulist::emit(cpus.iter().copied()),
        "starting race"
    );

    let harness = RaceHarness::new(bindings.clone(), &cpus, config.iterations());
    let histograms = access::with_strategy(mode, &harness)??;

    let histogram = aggregate(mode.width().lanes(), histograms);
    let classification = classify(&histogram);

    debug!(
        %mode,
        total = histogram.total(),
        verdict = ?classification.verdict(),
        "race finished"
    );

    Ok(classification)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;

    use super::*;
    use crate::pal::MockBindings;

    fn bindings_with_cpus(cpus: Vec<CpuId>) -> BindingsFacade {
        let mut bindings = MockBindings::new();

        bindings
            .expect_current_thread_allowed_cpus()
            .times(1)
            .returning(move || Ok(cpus.clone()));

        bindings
            .expect_pin_current_thread_to()
            .returning(|_| Ok(()));

        BindingsFacade::from_mock(bindings)
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri does not support inline assembly.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    fn histogram_is_conserved_across_workers() {
        let bindings = bindings_with_cpus(vec![0, 1, 2]);
        let config = RunConfig::new(Mode::Width16Aligned).with_iterations(10_000);

        let classification = run_with(&bindings, &config).unwrap();

        let total: u64 = classification
            .observations()
            .iter()
            .map(Observation::count)
            .sum();
        assert_eq!(total, 30_000);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri does not support inline assembly.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    fn zero_iterations_produce_no_observations() {
        let bindings = bindings_with_cpus(vec![0, 1]);
        let config = RunConfig::new(Mode::Width16Split).with_iterations(0);

        let classification = run_with(&bindings, &config).unwrap();

        assert!(classification.observations().is_empty());
        assert_eq!(classification.verdict(), Verdict::Atomic);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri does not support inline assembly.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    fn single_worker_sees_only_canonical_masks() {
        let bindings = bindings_with_cpus(vec![4]);
        let config = RunConfig::new(Mode::Width16Aligned).with_iterations(1000);

        let classification = run_with(&bindings, &config).unwrap();

        // Without a concurrent writer, the loads alternate between the two patterns.
        let lines: Vec<_> = classification
            .observations()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, vec!["0 500", "f 500"]);
        assert_eq!(classification.verdict(), Verdict::Atomic);
    }

    #[test]
    fn requested_cpu_must_be_allowed() {
        let mut bindings = MockBindings::new();
        bindings
            .expect_current_thread_allowed_cpus()
            .returning(|| Ok(vec![0, 1]));
        bindings.expect_pin_current_thread_to().never();

        let config = RunConfig::new(Mode::Width16Aligned).with_cpus(vec![1, 2]);

        let result = run_with(&BindingsFacade::from_mock(bindings), &config);

        assert!(matches!(result, Err(Error::CpuNotAllowed { cpu: 2 })));
    }

    #[test]
    fn affinity_query_failure_is_fatal() {
        let mut bindings = MockBindings::new();
        bindings
            .expect_current_thread_allowed_cpus()
            .returning(|| Err(io::Error::from(io::ErrorKind::Unsupported)));
        bindings.expect_pin_current_thread_to().never();

        let config = RunConfig::new(Mode::Width16Aligned);

        let result = run_with(&BindingsFacade::from_mock(bindings), &config);

        assert!(matches!(result, Err(Error::AffinityQuery { .. })));
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri does not support inline assembly.
    fn unsupported_mode_is_reported_before_racing() {
        let Some(mode) = Mode::ALL.into_iter().find(|mode| !is_supported(*mode)) else {
            // Everything is supported on this processor, nothing to test.
            return;
        };

        let mut bindings = MockBindings::new();
        bindings
            .expect_current_thread_allowed_cpus()
            .returning(|| Ok(vec![0]));
        bindings.expect_pin_current_thread_to().never();

        let config = RunConfig::new(mode);

        let result = run_with(&BindingsFacade::from_mock(bindings), &config);

        assert!(matches!(result, Err(Error::UnsupportedMode { mode: m }) if m == mode));
    }
}
