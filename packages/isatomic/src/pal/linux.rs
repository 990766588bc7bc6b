use std::{io, mem};

use libc::cpu_set_t;

use crate::CpuId;
use crate::pal::Bindings;

/// Bindings that target the real operating system that the build is targeting.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

// Real OS bindings are excluded from coverage measurement because:
// 1. They are tested via integration tests running on actual Linux.
// 2. Error paths require OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    fn current_thread_allowed_cpus(&self) -> Result<Vec<CpuId>, io::Error> {
        // SAFETY: All zeroes is a valid cpu_set_t.
        let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };

        // 0 means current thread.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_getaffinity(0, size_of::<cpu_set_t>(), &raw mut cpuset) };

        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        #[expect(
            clippy::cast_sign_loss,
            reason = "CPU_SETSIZE is a small positive constant"
        )]
        let max_cpus = libc::CPU_SETSIZE as usize;

        Ok((0..max_cpus)
            // SAFETY: The index is within the bounds of the set.
            .filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &cpuset) })
            .map(|cpu| {
                CpuId::try_from(cpu).expect("CPU_SETSIZE is far smaller than u32::MAX")
            })
            .collect())
    }

    fn pin_current_thread_to(&self, cpu: CpuId) -> Result<(), io::Error> {
        // SAFETY: All zeroes is a valid (empty) cpu_set_t.
        let mut cpuset: cpu_set_t = unsafe { mem::zeroed() };

        let index = cpu as usize;

        #[expect(
            clippy::cast_sign_loss,
            reason = "CPU_SETSIZE is a small positive constant"
        )]
        let max_cpus = libc::CPU_SETSIZE as usize;

        if index >= max_cpus {
            // CPU_SET() would silently ignore this and we would pin to an empty set.
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }

        // SAFETY: The index is within the bounds of the set, verified above.
        unsafe { libc::CPU_SET(index, &mut cpuset) };

        // 0 means current thread.
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::sched_setaffinity(0, size_of::<cpu_set_t>(), &raw const cpuset) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn current_thread_has_some_cpus() {
        let cpus = BuildTargetBindings.current_thread_allowed_cpus().unwrap();

        assert!(!cpus.is_empty());
        assert!(cpus.is_sorted());
    }

    #[test]
    fn pinning_narrows_affinity_to_one_cpu() {
        // We pin a throwaway thread so the test runner thread keeps its affinity.
        thread::spawn(|| {
            let cpus = BuildTargetBindings.current_thread_allowed_cpus().unwrap();
            let last = *cpus.last().unwrap();

            BuildTargetBindings.pin_current_thread_to(last).unwrap();

            assert_eq!(
                BuildTargetBindings.current_thread_allowed_cpus().unwrap(),
                vec![last]
            );
        })
        .join()
        .unwrap();
    }

    #[test]
    fn pinning_to_out_of_range_cpu_fails() {
        thread::spawn(|| {
            let error = BuildTargetBindings
                .pin_current_thread_to(CpuId::MAX)
                .unwrap_err();

            assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        })
        .join()
        .unwrap();
    }
}
