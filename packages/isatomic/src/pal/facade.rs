#![cfg_attr(coverage_nightly, coverage(off))]

use std::fmt::{self, Debug};
use std::io;
#[cfg(test)]
use std::sync::Arc;

use crate::CpuId;
#[cfg(test)]
use crate::pal::MockBindings;
use crate::pal::{Bindings, BuildTargetBindings};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Target(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

impl BindingsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetBindings)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockBindings) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Bindings for BindingsFacade {
    fn current_thread_allowed_cpus(&self) -> Result<Vec<CpuId>, io::Error> {
        match self {
            Self::Target(bindings) => bindings.current_thread_allowed_cpus(),
            #[cfg(test)]
            Self::Mock(mock) => mock.current_thread_allowed_cpus(),
        }
    }

    fn pin_current_thread_to(&self, cpu: CpuId) -> Result<(), io::Error> {
        match self {
            Self::Target(bindings) => bindings.pin_current_thread_to(cpu),
            #[cfg(test)]
            Self::Mock(mock) => mock.pin_current_thread_to(cpu),
        }
    }
}

impl Debug for BindingsFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
