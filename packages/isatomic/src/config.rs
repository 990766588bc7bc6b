use crate::{CpuId, Mode};

/// Number of iterations each worker performs unless configured otherwise.
pub const DEFAULT_ITERATIONS: u64 = 1_000_000;

/// What to race and where.
///
/// # Example
///
/// ```
/// use isatomic::{Mode, RunConfig};
///
/// let config = RunConfig::new(Mode::Width16Split)
///     .with_iterations(10_000)
///     .with_cpus(vec![0, 1]);
///
/// assert_eq!(config.mode(), Mode::Width16Split);
/// assert_eq!(config.iterations(), 10_000);
/// assert_eq!(config.cpus(), Some(&[0, 1][..]));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
    mode: Mode,
    iterations: u64,
    cpus: Option<Vec<CpuId>>,
}

impl RunConfig {
    /// Creates a configuration that runs [`DEFAULT_ITERATIONS`] iterations of `mode` on every
    /// processor the current thread is allowed to run on.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            iterations: DEFAULT_ITERATIONS,
            cpus: None,
        }
    }

    /// Sets the number of iterations each worker performs. Zero is allowed and results in an
    /// empty histogram.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Restricts the race to the given processors, one worker each. Every processor must be
    /// one the current thread is allowed to run on.
    #[must_use]
    pub fn with_cpus(mut self, cpus: Vec<CpuId>) -> Self {
        self.cpus = Some(cpus);
        self
    }

    /// The test mode to race.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The number of iterations each worker performs.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// The processors the race is restricted to, if any.
    #[must_use]
    pub fn cpus(&self) -> Option<&[CpuId]> {
        self.cpus.as_deref()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::new(Mode::Width32Aligned);

        assert_eq!(config.mode(), Mode::Width32Aligned);
        assert_eq!(config.iterations(), DEFAULT_ITERATIONS);
        assert_eq!(config.cpus(), None);
    }
}
