//! AArch64 strategies. Only 16-byte accesses exist here: `ldr q`/`str q` are the widest single
//! load and store of a vector register. Wider accesses would need the pair instructions, which
//! are two architectural accesses and therefore not a test of one wide access.

use std::arch::asm;

use super::{AccessStrategy, StrategyVisitor, pattern};
use crate::{Error, LaneMask, Mode, Result, ScratchRegion, Width};

pub(super) fn with_strategy<V: StrategyVisitor>(mode: Mode, visitor: V) -> Result<V::Output> {
    match mode.width() {
        Width::Bytes16 => Ok(visitor.visit(&Neon::new(mode))),
        Width::Bytes32 | Width::Bytes64 => Err(Error::UnsupportedMode { mode }),
    }
}

/// 16-byte accesses via `ldr q`/`str q`. The same instructions serve all placements, as
/// AArch64 has no alignment-checking variants of them.
#[derive(Debug)]
struct Neon {
    mode: Mode,
}

impl Neon {
    fn new(mode: Mode) -> Self {
        debug_assert_eq!(mode.width(), Width::Bytes16);

        Self { mode }
    }
}

impl AccessStrategy for Neon {
    fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    fn load_mask(&self, region: &ScratchRegion) -> LaneMask {
        let ptr = region.at(self.mode.offset());
        let low: u64;
        let high: u64;

        // The two halves are moved out of the vector register after the load; it is the
        // single `ldr` that observes memory.
        // SAFETY: The mode layout keeps the 16 bytes inside the region.
        unsafe {
            asm!(
                "ldr {v:q}, [{ptr}]",
                "mov {low}, {v}.d[0]",
                "mov {high}, {v}.d[1]",
                ptr = in(reg) ptr,
                v = out(vreg) _,
                low = lateout(reg) low,
                high = lateout(reg) high,
                options(nostack, readonly, preserves_flags),
            );
        }

        lane_mask(low, high)
    }

    #[inline]
    fn store_pattern(&self, region: &ScratchRegion, all_set: bool) {
        let ptr = region.at(self.mode.offset());
        let src = pattern(all_set);

        // SAFETY: The mode layout keeps the 16 bytes inside the region.
        // The pattern is 64 bytes long.
        unsafe {
            asm!(
                "ldr {v:q}, [{src}]",
                "str {v:q}, [{ptr}]",
                src = in(reg) src,
                ptr = in(reg) ptr,
                v = out(vreg) _,
                options(nostack, preserves_flags),
            );
        }
    }
}

/// High bit of each 32-bit lane of a 16-byte value given as its low and high 64-bit halves.
#[expect(
    clippy::cast_possible_truncation,
    reason = "only the low 4 bits can be set"
)]
fn lane_mask(low: u64, high: u64) -> LaneMask {
    (((low >> 31) & 0b0001)
        | ((low >> 62) & 0b0010)
        | ((high >> 29) & 0b0100)
        | ((high >> 60) & 0b1000)) as LaneMask
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn lane_mask_takes_high_bit_of_each_lane() {
        assert_eq!(lane_mask(0, 0), 0b0000);
        assert_eq!(lane_mask(u64::MAX, u64::MAX), 0b1111);

        assert_eq!(lane_mask(0x0000_0000_8000_0000, 0), 0b0001);
        assert_eq!(lane_mask(0x8000_0000_0000_0000, 0), 0b0010);
        assert_eq!(lane_mask(0, 0x0000_0000_8000_0000), 0b0100);
        assert_eq!(lane_mask(0, 0x8000_0000_0000_0000), 0b1000);

        // Low bits of a lane do not matter.
        assert_eq!(lane_mask(0x7FFF_FFFF_7FFF_FFFF, 0x7FFF_FFFF_7FFF_FFFF), 0b0000);
    }
}
