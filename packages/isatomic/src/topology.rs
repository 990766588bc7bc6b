use nonempty::NonEmpty;

use crate::pal::{Bindings, BindingsFacade};
use crate::{CpuId, Error, Result};

/// Returns the processors the current thread is allowed to run on, in ascending order.
///
/// This is the set of processors a race uses unless the caller narrows it down.
///
/// # Errors
///
/// Returns [`Error::AffinityQuery`] if the operating system cannot tell us the affinity of the
/// current thread (which includes platforms where affinity is not supported at all) and
/// [`Error::NoAllowedCpus`] if the affinity mask is empty.
pub fn allowed_cpus() -> Result<NonEmpty<CpuId>> {
    allowed_cpus_with(&BindingsFacade::target())
}

pub(crate) fn allowed_cpus_with(bindings: &BindingsFacade) -> Result<NonEmpty<CpuId>> {
    let cpus = bindings
        .current_thread_allowed_cpus()
        .map_err(|source| Error::AffinityQuery { source })?;

    NonEmpty::from_vec(cpus).ok_or(Error::NoAllowedCpus)
}

/// Narrows down the allowed processors to the ones the caller requested.
///
/// Without a request, all allowed processors are used. With a request, the requested processors
/// are used in the order given, ignoring duplicates.
pub(crate) fn select(
    allowed: NonEmpty<CpuId>,
    requested: Option<&[CpuId]>,
) -> Result<NonEmpty<CpuId>> {
    let Some(requested) = requested else {
        return Ok(allowed);
    };

    let mut selected = Vec::with_capacity(requested.len());

    for &cpu in requested {
        if !allowed.contains(&cpu) {
            return Err(Error::CpuNotAllowed { cpu });
        }

        if !selected.contains(&cpu) {
            selected.push(cpu);
        }
    }

    NonEmpty::from_vec(selected).ok_or(Error::NoAllowedCpus)
}
