use crate::Histogram;

/// Sums the private histograms of all workers of a race into one global histogram.
///
/// Must only be called once all workers have finished, so the histograms are no longer
/// being written to. This is guaranteed by ownership: the histograms are moved out of the
/// joined worker threads.
///
/// # Panics
///
/// Panics if any of the histograms does not have `lanes` lanes.
#[must_use]
pub fn aggregate(lanes: u32, histograms: impl IntoIterator<Item = Histogram>) -> Histogram {
    histograms
        .into_iter()
        .fold(Histogram::new(lanes), |mut total, histogram| {
            total.merge(&histogram);
            total
        })
}
