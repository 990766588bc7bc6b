use std::fmt::{self, Display};

use crate::mode::all_set_mask;
use crate::{Histogram, LaneMask};

/// Outcome of a race.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "a load/store is either atomic or it is not"
)]
pub enum Verdict {
    /// Every observed lane mask was one of the two canonical patterns.
    Atomic,

    /// At least one load observed a mix of the two canonical patterns.
    Torn,
}

/// One nonzero bucket of a classified histogram.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Observation {
    mask: LaneMask,
    count: u64,
    torn: bool,
}

impl Observation {
    /// The observed lane mask.
    #[must_use]
    pub fn mask(&self) -> LaneMask {
        self.mask
    }

    /// How many times the mask was observed.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether the mask is evidence of a torn load or store.
    #[must_use]
    pub fn is_torn(&self) -> bool {
        self.torn
    }
}

/// Formats the observation as a report line: the mask in hex, the count in decimal and an
/// annotation if the mask is torn.
impl Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x} {}", self.mask, self.count)?;

        if self.torn {
            write!(f, " torn load/store!")?;
        }

        Ok(())
    }
}

/// The result of inspecting a histogram for torn observations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Classification {
    observations: Vec<Observation>,
}

impl Classification {
    /// The nonzero buckets of the histogram, in ascending mask order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// [`Verdict::Torn`] if any observation is torn, [`Verdict::Atomic`] otherwise.
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.observations.iter().any(Observation::is_torn) {
            Verdict::Torn
        } else {
            Verdict::Atomic
        }
    }
}

/// Classifies every nonzero bucket of `histogram` as torn or not torn.
///
/// Only two lane masks can be observed if loads and stores are atomic: `0` (the all-clear
/// pattern) and `2^lanes - 1` (the all-set pattern). Any other mask is torn.
///
/// This is a pure function of the histogram.
///
/// # Example
///
/// ```
/// use isatomic::{Histogram, Verdict, classify};
///
/// let histogram = Histogram::from_counts(4, [(0x0, 500), (0xc, 1), (0xf, 499)]);
/// let classification = classify(&histogram);
///
/// assert_eq!(classification.verdict(), Verdict::Torn);
/// assert_eq!(classification.observations()[1].to_string(), "c 1 torn load/store!");
/// ```
#[must_use]
pub fn classify(histogram: &Histogram) -> Classification {
    let all_set = all_set_mask(histogram.lanes());

    let observations = histogram
        .observed()
        .map(|(mask, count)| Observation {
            mask,
            count,
            torn: mask != 0 && mask != all_set,
        })
        .collect();

    Classification { observations }
}
