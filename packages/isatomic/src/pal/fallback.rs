use std::io;

use crate::CpuId;
use crate::pal::Bindings;

/// Bindings for operating systems (and Miri) where we cannot enumerate or pin to processors.
///
/// A race without pinning does not produce a trustworthy measurement, so every operation fails
/// instead of pretending to succeed.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    fn current_thread_allowed_cpus(&self) -> Result<Vec<CpuId>, io::Error> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "processor affinity is not supported on this platform",
        ))
    }

    fn pin_current_thread_to(&self, _cpu: CpuId) -> Result<(), io::Error> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "processor affinity is not supported on this platform",
        ))
    }
}
