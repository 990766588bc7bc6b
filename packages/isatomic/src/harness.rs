use std::panic;
use std::thread;

use nonempty::NonEmpty;
use tracing::debug;

use crate::access::{AccessStrategy, StrategyVisitor};
use crate::barrier::StartBarrier;
use crate::pal::{Bindings, BindingsFacade};
use crate::{CpuId, Error, Histogram, Result, ScratchRegion};

/// Races one pinned worker per processor against a shared [`ScratchRegion`].
///
/// The calling thread is one of the workers - it is pinned to the first processor in the list
/// for the rest of its life.
#[derive(Debug)]
pub(crate) struct RaceHarness<'a> {
    bindings: BindingsFacade,
    cpus: &'a NonEmpty<CpuId>,
    iterations: u64,
}

impl<'a> RaceHarness<'a> {
    pub(crate) fn new(
        bindings: BindingsFacade,
        cpus: &'a NonEmpty<CpuId>,
        iterations: u64,
    ) -> Self {
        Self {
            bindings,
            cpus,
            iterations,
        }
    }

    /// Runs the race to completion and returns the private histogram of every worker, the
    /// calling thread's first.
    ///
    /// Either every worker runs all its iterations or (if any worker cannot be started or
    /// pinned) none runs any and the first failure is returned.
    pub(crate) fn run<S: AccessStrategy>(&self, strategy: &S) -> Result<Vec<Histogram>> {
        let region = ScratchRegion::new();
        let barrier = StartBarrier::new(self.cpus.len());

        let outcomes = thread::scope(|s| {
            let region = &region;
            let barrier = &barrier;

            let spawned = self
                .cpus
                .tail()
                .iter()
                .map(|&cpu| {
                    thread::Builder::new()
                        .name(format!("isatomic-cpu{cpu}"))
                        .spawn_scoped(s, move || self.worker(cpu, strategy, region, barrier))
                        .map_err(|source| {
                            // The workers that did start would otherwise wait forever.
                            barrier.abandon();
                            Error::Spawn { cpu, source }
                        })
                })
                .collect::<Vec<_>>();

            let mut outcomes = Vec::with_capacity(self.cpus.len());
            outcomes.push(self.worker(*self.cpus.first(), strategy, region, barrier));

            // Joining the scoped threads is what makes their histograms visible to us.
            for worker in spawned {
                outcomes.push(match worker {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload)),
                    Err(error) => Err(error),
                });
            }

            outcomes
        });

        let mut histograms = Vec::with_capacity(outcomes.len());
        let mut first_error = None;

        for outcome in outcomes {
            match outcome {
                Ok(Some(histogram)) => histograms.push(histogram),
                Ok(None) => {}
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        assert_eq!(
            histograms.len(),
            self.cpus.len(),
            "a worker can only be left out of the race if another worker failed"
        );

        Ok(histograms)
    }

    /// Returns `None` if another worker failed and the race was abandoned.
    fn worker<S: AccessStrategy>(
        &self,
        cpu: CpuId,
        strategy: &S,
        region: &ScratchRegion,
        barrier: &StartBarrier,
    ) -> Result<Option<Histogram>> {
        if let Err(source) = self.bindings.pin_current_thread_to(cpu) {
            barrier.abandon();
            return Err(Error::Pin { cpu, source });
        }

        debug!(cpu, "worker pinned");

        // Allocated before the start, so all workers enter the loop at the same time.
        let mut histogram = Histogram::new(strategy.mode().width().lanes());

        if barrier.arrive_and_wait().is_err() {
            debug!(cpu, "race abandoned before start");
            return Ok(None);
        }

        race(strategy, region, self.iterations, &mut histogram);

        debug!(cpu, iterations = self.iterations, "worker finished");

        Ok(Some(histogram))
    }
}

impl StrategyVisitor for &RaceHarness<'_> {
    type Output = Result<Vec<Histogram>>;

    fn visit<S: AccessStrategy>(self, strategy: &S) -> Self::Output {
        self.run(strategy)
    }
}

/// The loop under test. There is deliberately no synchronization between the workers here.
///
/// Each worker alternates between the two patterns based on its own iteration counter, starting
/// with the all-set pattern.
fn race<S: AccessStrategy>(
    strategy: &S,
    region: &ScratchRegion,
    iterations: u64,
    histogram: &mut Histogram,
) {
    let mut all_set = false;

    for _ in 0..iterations {
        histogram.record(strategy.load_mask(region));

        all_set = !all_set;
        strategy.store_pattern(region, all_set);
    }
}
