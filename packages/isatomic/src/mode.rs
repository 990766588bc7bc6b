use std::str::FromStr;

use derive_more::Display;
use static_assertions::const_assert;

use crate::{Error, LaneMask};

/// Size of a cache line on every target we support, in bytes.
pub const CACHE_LINE_BYTES: usize = 64;

/// Size of the scratch region that the racing workers share, in bytes.
///
/// Two cache lines, enough for a 64-byte access that straddles the line boundary.
pub const SCRATCH_REGION_BYTES: usize = 2 * CACHE_LINE_BYTES;

/// Width of a single load or store.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "the set of vector widths is fixed by the tokens the tool accepts"
)]
pub enum Width {
    /// 16 bytes (128 bits), extracted as 4 lanes of 32 bits.
    #[display("16B")]
    Bytes16,

    /// 32 bytes (256 bits), extracted as 4 lanes of 64 bits.
    #[display("32B")]
    Bytes32,

    /// 64 bytes (512 bits), extracted as 8 lanes of 64 bits.
    #[display("64B")]
    Bytes64,
}

impl Width {
    /// Number of bytes touched by one access.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bytes16 => 16,
            Self::Bytes32 => 32,
            Self::Bytes64 => 64,
        }
    }

    /// Number of lanes in the lane mask extracted from a load of this width.
    #[must_use]
    pub const fn lanes(self) -> u32 {
        match self {
            Self::Bytes16 | Self::Bytes32 => 4,
            Self::Bytes64 => 8,
        }
    }

    /// The lane mask observed when the all-set pattern is fully visible.
    #[must_use]
    pub const fn all_set_mask(self) -> LaneMask {
        all_set_mask(self.lanes())
    }
}

/// The lane mask with every one of `lanes` bits set.
#[must_use]
pub(crate) const fn all_set_mask(lanes: u32) -> LaneMask {
    // 2^lanes - 1, without overflowing for the (theoretical) 32-lane case.
    LaneMask::MAX >> (LaneMask::BITS - lanes)
}

/// Where an access lies in relation to its natural alignment and to cache line boundaries.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "aligned, unaligned and split are the only possible relations"
)]
pub enum Placement {
    /// The offset is a multiple of the access width.
    #[display("aligned")]
    Aligned,

    /// The offset is not a multiple of the access width but the access stays within one
    /// cache line.
    #[display("unaligned")]
    Unaligned,

    /// The access straddles a cache line boundary.
    #[display("cacheline split")]
    Split,
}

/// A test mode, selecting both the access width and the placement of the access.
///
/// Displays as the token that selects the mode on the command line.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "mirrors the fixed set of command line tokens"
)]
pub enum Mode {
    /// `128`: 16-byte aligned loads/stores.
    #[display("128")]
    Width16Aligned,

    /// `128u`: 16-byte unaligned loads/stores.
    #[display("128u")]
    Width16Unaligned,

    /// `128s`: 16-byte cache line split loads/stores.
    #[display("128s")]
    Width16Split,

    /// `256`: 32-byte aligned loads/stores.
    #[display("256")]
    Width32Aligned,

    /// `256u`: 32-byte unaligned loads/stores.
    #[display("256u")]
    Width32Unaligned,

    /// `256s`: 32-byte cache line split loads/stores.
    #[display("256s")]
    Width32Split,

    /// `512`: 64-byte aligned loads/stores.
    #[display("512")]
    Width64Aligned,

    /// `512s`: 64-byte cache line split loads/stores.
    ///
    /// There is no unaligned 64-byte mode because every unaligned 64-byte access splits a line.
    #[display("512s")]
    Width64Split,
}

impl Mode {
    /// Every mode, in the order they are listed in the usage text.
    pub const ALL: [Self; 8] = [
        Self::Width16Aligned,
        Self::Width16Unaligned,
        Self::Width16Split,
        Self::Width32Aligned,
        Self::Width32Unaligned,
        Self::Width32Split,
        Self::Width64Aligned,
        Self::Width64Split,
    ];

    /// The width of each load and store.
    #[must_use]
    pub const fn width(self) -> Width {
        match self {
            Self::Width16Aligned | Self::Width16Unaligned | Self::Width16Split => Width::Bytes16,
            Self::Width32Aligned | Self::Width32Unaligned | Self::Width32Split => Width::Bytes32,
            Self::Width64Aligned | Self::Width64Split => Width::Bytes64,
        }
    }

    /// The placement of each load and store.
    #[must_use]
    pub const fn placement(self) -> Placement {
        match self {
            Self::Width16Aligned | Self::Width32Aligned | Self::Width64Aligned => {
                Placement::Aligned
            }
            Self::Width16Unaligned | Self::Width32Unaligned => Placement::Unaligned,
            Self::Width16Split | Self::Width32Split | Self::Width64Split => Placement::Split,
        }
    }

    /// Byte offset of the accessed range from the start of the (cache line aligned)
    /// scratch region.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Width16Aligned | Self::Width32Aligned | Self::Width64Aligned => 0,
            Self::Width16Unaligned | Self::Width32Unaligned => 3,
            Self::Width16Split => 56,
            Self::Width32Split => 48,
            Self::Width64Split => 32,
        }
    }

    /// Human-readable description, as listed in the usage text and in error messages.
    #[must_use]
    pub fn description(self) -> String {
        match self.placement() {
            Placement::Aligned => format!("{} loads/stores", self.width()),
            placement => format!("{} {placement} loads/stores", self.width()),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.to_string() == token)
            .ok_or_else(|| Error::InvalidMode {
                token: token.to_owned(),
            })
    }
}

/// Whether the offset of `mode` actually has the placement the mode claims.
#[expect(
    clippy::integer_division,
    reason = "we want to know which cache line a byte is in"
)]
const fn layout_is_valid(mode: Mode) -> bool {
    let width = mode.width().bytes();
    let first = mode.offset();
    let last = first + width - 1;

    let fits = last < SCRATCH_REGION_BYTES;
    let same_line = first / CACHE_LINE_BYTES == last / CACHE_LINE_BYTES;
    let aligned = first % width == 0;

    let placement_holds = match mode.placement() {
        Placement::Aligned => aligned,
        Placement::Unaligned => !aligned && same_line,
        Placement::Split => !same_line,
    };

    fits && placement_holds
}

const_assert!(layout_is_valid(Mode::Width16Aligned));
const_assert!(layout_is_valid(Mode::Width16Unaligned));
const_assert!(layout_is_valid(Mode::Width16Split));
const_assert!(layout_is_valid(Mode::Width32Aligned));
const_assert!(layout_is_valid(Mode::Width32Unaligned));
const_assert!(layout_is_valid(Mode::Width32Split));
const_assert!(layout_is_valid(Mode::Width64Aligned));
const_assert!(layout_is_valid(Mode::Width64Split));

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        for token in ["", "128x", "512u", "64", " 128", "256S"] {
            assert!(
                matches!(token.parse::<Mode>(), Err(Error::InvalidMode { token: t }) if t == token),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn lane_counts_match_extraction_granularity() {
        assert_eq!(Width::Bytes16.lanes(), 4);
        assert_eq!(Width::Bytes32.lanes(), 4);
        assert_eq!(Width::Bytes64.lanes(), 8);

        assert_eq!(Width::Bytes16.all_set_mask(), 0xf);
        assert_eq!(Width::Bytes32.all_set_mask(), 0xf);
        assert_eq!(Width::Bytes64.all_set_mask(), 0xff);
    }

    #[test]
    fn all_set_mask_handles_full_width() {
        assert_eq!(all_set_mask(1), 1);
        assert_eq!(all_set_mask(32), LaneMask::MAX);
    }

    #[test]
    fn split_modes_straddle_a_line() {
        for mode in Mode::ALL
            .into_iter()
            .filter(|m| m.placement() == Placement::Split)
        {
            let first = mode.offset();
            let last = first + mode.width().bytes() - 1;

            assert!(first < CACHE_LINE_BYTES, "{mode} should start in line 0");
            assert!(last >= CACHE_LINE_BYTES, "{mode} should end in line 1");
        }
    }

    #[test]
    fn descriptions() {
        assert_eq!(Mode::Width16Aligned.description(), "16B loads/stores");
        assert_eq!(
            Mode::Width32Unaligned.description(),
            "32B unaligned loads/stores"
        );
        assert_eq!(
            Mode::Width64Split.description(),
            "64B cacheline split loads/stores"
        );
    }
}
