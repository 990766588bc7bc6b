#![cfg_attr(
    test,
    expect(
        clippy::struct_field_names,
        reason = "false positive from automock generated code"
    )
)]

use std::fmt::Debug;
use std::io;

use crate::CpuId;

/// Operating system calls needed to enumerate and pin to processors.
///
/// All PAL calls must go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    /// The processors the current thread is allowed to run on, in ascending order.
    fn current_thread_allowed_cpus(&self) -> Result<Vec<CpuId>, io::Error>;

    /// Restricts the current thread to run only on `cpu`.
    fn pin_current_thread_to(&self, cpu: CpuId) -> Result<(), io::Error>;
}
