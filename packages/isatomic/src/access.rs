//! Access strategies perform the wide loads and stores whose atomicity we are testing.
//!
//! Every strategy issues exactly one load instruction and exactly one store instruction of the
//! full width per call. This is why they are written in inline assembly instead of with the
//! `core::arch` intrinsics: the compiler is free to split, fuse or elide intrinsic loads and
//! stores (and with some code generation settings does split 32-byte accesses into two
//! 16-byte halves), which would silently turn the measurement into a measurement of something
//! else. Inline assembly is emitted exactly as written.
//!
//! Inline assembly also keeps the deliberately racing accesses outside the Rust abstract
//! machine - from the point of view of Rust, the region is only ever touched by opaque
//! assembly blocks, so there is no data race for the compiler to exploit.

use std::fmt::Debug;

use crate::{LaneMask, Mode, Result, ScratchRegion};

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
use x86_64 as target;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
use aarch64 as target;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod unsupported;
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
use unsupported as target;

/// Loads and stores one fixed byte range of a [`ScratchRegion`] with single wide instructions.
pub(crate) trait AccessStrategy: Debug + Send + Sync {
    /// The width and placement of the accessed range.
    fn mode(&self) -> Mode;

    /// Loads the range with one instruction and returns the high bit of each lane.
    fn load_mask(&self, region: &ScratchRegion) -> LaneMask;

    /// Stores either the all-set or the all-clear pattern into the range with one instruction.
    fn store_pattern(&self, region: &ScratchRegion, all_set: bool);
}

/// Receives the strategy for a mode as a concrete type, so the race loop can be monomorphized
/// for it instead of paying for dynamic dispatch on every access.
pub(crate) trait StrategyVisitor {
    type Output;

    fn visit<S: AccessStrategy>(self, strategy: &S) -> Self::Output;
}

/// Calls `visitor` with the strategy that implements `mode` on the current processor.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMode`][crate::Error::UnsupportedMode] if the current processor
/// (or build target) has no single instruction that performs an access of the required width.
pub(crate) fn with_strategy<V: StrategyVisitor>(mode: Mode, visitor: V) -> Result<V::Output> {
    target::with_strategy(mode, visitor)
}

/// Whether `mode` can be tested on the current processor.
#[must_use]
pub fn is_supported(mode: Mode) -> bool {
    struct Probe;

    impl StrategyVisitor for Probe {
        type Output = ();

        fn visit<S: AccessStrategy>(self, _strategy: &S) {}
    }

    with_strategy(mode, Probe).is_ok()
}

/// Source of the canonical patterns. Stores copy from here, so the store instruction itself is
/// the only write to the scratch region.
#[repr(C, align(64))]
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    allow(dead_code, reason = "no strategies exist on this target")
)]
struct Pattern([u8; 64]);

static ALL_CLEAR: Pattern = Pattern([0x00; 64]);
static ALL_SET: Pattern = Pattern([0xFF; 64]);

/// Pointer to 64 bytes of the requested canonical pattern, aligned to 64 bytes.
#[cfg_attr(
    not(any(target_arch = "x86_64", target_arch = "aarch64")),
    allow(dead_code, reason = "no strategies exist on this target")
)]
fn pattern(all_set: bool) -> *const u8 {
    if all_set {
        ALL_SET.0.as_ptr()
    } else {
        ALL_CLEAR.0.as_ptr()
    }
}
