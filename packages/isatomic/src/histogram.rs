use crate::LaneMask;
use crate::mode::all_set_mask;

/// Counts how many times each lane mask was observed.
///
/// There is one bucket for every possible mask of the configured lane count, i.e.
/// `2^lanes` buckets.
///
/// # Example
///
/// ```
/// use isatomic::Histogram;
///
/// let mut histogram = Histogram::new(4);
/// histogram.record(0x0);
/// histogram.record(0xf);
/// histogram.record(0xf);
///
/// assert_eq!(histogram.count(0xf), 2);
/// assert_eq!(histogram.total(), 3);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Histogram {
    lanes: u32,
    counts: Box<[u64]>,
}

impl Histogram {
    /// Creates an empty histogram for lane masks with `lanes` lanes.
    ///
    /// # Panics
    ///
    /// Panics if `lanes` is zero or greater than 16 (the widest supported extraction has 8).
    #[must_use]
    pub fn new(lanes: u32) -> Self {
        assert!(
            (1..=16).contains(&lanes),
            "lane count {lanes} is outside the supported range 1..=16"
        );

        let buckets = all_set_mask(lanes) as usize + 1;

        Self {
            lanes,
            counts: vec![0; buckets].into_boxed_slice(),
        }
    }

    /// Creates a histogram with the given counts, e.g. to classify a synthetic data set.
    ///
    /// Masks that appear more than once have their counts added together.
    ///
    /// # Panics
    ///
    /// Panics if any mask does not fit into `lanes` lanes.
    #[must_use]
    pub fn from_counts(lanes: u32, counts: impl IntoIterator<Item = (LaneMask, u64)>) -> Self {
        let mut histogram = Self::new(lanes);

        for (mask, count) in counts {
            let bucket = histogram.bucket_mut(mask);
            *bucket = bucket
                .checked_add(count)
                .expect("observation count overflowed u64");
        }

        histogram
    }

    /// Number of lanes in the lane masks this histogram counts.
    #[must_use]
    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    /// Counts one observation of `mask`.
    ///
    /// # Panics
    ///
    /// Panics if the mask does not fit into the lane count of the histogram.
    #[inline]
    pub fn record(&mut self, mask: LaneMask) {
        let bucket = self.bucket_mut(mask);

        // Cannot overflow in practice - that would take centuries of iterations.
        *bucket = bucket.wrapping_add(1);
    }

    /// How many times `mask` was observed. Masks that do not fit into the lane count of the
    /// histogram were never observed.
    #[must_use]
    pub fn count(&self, mask: LaneMask) -> u64 {
        self.counts.get(mask as usize).copied().unwrap_or_default()
    }

    /// Total number of observations across all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates over the buckets that have at least one observation, in ascending mask order.
    pub fn observed(&self) -> impl Iterator<Item = (LaneMask, u64)> + '_ {
        self.counts
            .iter()
            .zip(0..)
            .filter(|(count, _)| **count != 0)
            .map(|(count, mask)| (mask, *count))
    }

    /// Adds the counts of `other` to the counts of `self`.
    ///
    /// # Panics
    ///
    /// Panics if the two histograms have a different lane count.
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.lanes, other.lanes,
            "cannot merge histograms with different lane counts"
        );

        for (total, count) in self.counts.iter_mut().zip(other.counts.iter()) {
            *total = total
                .checked_add(*count)
                .expect("observation count overflowed u64");
        }
    }

    fn bucket_mut(&mut self, mask: LaneMask) -> &mut u64 {
        let lanes = self.lanes;

        self.counts
            .get_mut(mask as usize)
            .unwrap_or_else(|| panic!("lane mask {mask:#x} does not fit into {lanes} lanes"))
    }
}
