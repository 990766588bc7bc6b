//! x86-64 strategies: SSE2 for 16 bytes, AVX for 32 bytes and AVX-512F for 64 bytes.
//!
//! Aligned modes use the alignment-checking move instructions (`movdqa` and friends), so a
//! wrong offset faults instead of quietly testing the wrong placement.

use std::arch::{asm, is_x86_feature_detected};

use super::{AccessStrategy, StrategyVisitor, pattern};
use crate::{Error, LaneMask, Mode, Placement, Result, ScratchRegion, Width};

pub(super) fn with_strategy<V: StrategyVisitor>(mode: Mode, visitor: V) -> Result<V::Output> {
    let unsupported = || Error::UnsupportedMode { mode };

    let aligned = mode.placement() == Placement::Aligned;

    Ok(match (mode.width(), aligned) {
        (Width::Bytes16, true) => visitor.visit(&Sse2::<true>::new(mode)),
        (Width::Bytes16, false) => visitor.visit(&Sse2::<false>::new(mode)),
        (Width::Bytes32, true) => {
            visitor.visit(&Avx::<true>::new(mode).ok_or_else(unsupported)?)
        }
        (Width::Bytes32, false) => {
            visitor.visit(&Avx::<false>::new(mode).ok_or_else(unsupported)?)
        }
        (Width::Bytes64, true) => {
            visitor.visit(&Avx512::<true>::new(mode).ok_or_else(unsupported)?)
        }
        (Width::Bytes64, false) => {
            visitor.visit(&Avx512::<false>::new(mode).ok_or_else(unsupported)?)
        }
    })
}

/// 16-byte accesses via `movdqa`/`movdqu`, lane mask via `movmskps` (4 x 32 bits).
///
/// SSE2 is part of the x86-64 baseline, so this is always available.
#[derive(Debug)]
struct Sse2<const ALIGNED: bool> {
    mode: Mode,
}

impl<const ALIGNED: bool> Sse2<ALIGNED> {
    fn new(mode: Mode) -> Self {
        debug_assert_eq!(mode.width(), Width::Bytes16);

        Self { mode }
    }
}

impl<const ALIGNED: bool> AccessStrategy for Sse2<ALIGNED> {
    fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    fn load_mask(&self, region: &ScratchRegion) -> LaneMask {
        let ptr = region.at(self.mode.offset());
        let mask: LaneMask;

        if ALIGNED {
            // SAFETY: The mode layout keeps the 16 bytes inside the region, 16-byte aligned.
            unsafe {
                asm!(
                    "movdqa {v}, xmmword ptr [{ptr}]",
                    "movmskps {mask:e}, {v}",
                    ptr = in(reg) ptr,
                    v = out(xmm_reg) _,
                    mask = lateout(reg) mask,
                    options(nostack, readonly, preserves_flags),
                );
            }
        } else {
            // SAFETY: The mode layout keeps the 16 bytes inside the region.
            unsafe {
                asm!(
                    "movdqu {v}, xmmword ptr [{ptr}]",
                    "movmskps {mask:e}, {v}",
                    ptr = in(reg) ptr,
                    v = out(xmm_reg) _,
                    mask = lateout(reg) mask,
                    options(nostack, readonly, preserves_flags),
                );
            }
        }

        mask
    }

    #[inline]
    fn store_pattern(&self, region: &ScratchRegion, all_set: bool) {
        let ptr = region.at(self.mode.offset());
        let src = pattern(all_set);

        if ALIGNED {
            // SAFETY: The mode layout keeps the 16 bytes inside the region, 16-byte aligned.
            // The pattern is 64 bytes long and 64-byte aligned.
            unsafe {
                asm!(
                    "movdqa {v}, xmmword ptr [{src}]",
                    "movdqa xmmword ptr [{ptr}], {v}",
                    src = in(reg) src,
                    ptr = in(reg) ptr,
                    v = out(xmm_reg) _,
                    options(nostack, preserves_flags),
                );
            }
        } else {
            // SAFETY: The mode layout keeps the 16 bytes inside the region.
            // The pattern is 64 bytes long and 64-byte aligned.
            unsafe {
                asm!(
                    "movdqa {v}, xmmword ptr [{src}]",
                    "movdqu xmmword ptr [{ptr}], {v}",
                    src = in(reg) src,
                    ptr = in(reg) ptr,
                    v = out(xmm_reg) _,
                    options(nostack, preserves_flags),
                );
            }
        }
    }
}

/// 32-byte accesses via `vmovdqa`/`vmovdqu`, lane mask via `vmovmskpd` (4 x 64 bits).
#[derive(Debug)]
struct Avx<const ALIGNED: bool> {
    // Type invariant: only constructed after AVX has been detected.
    mode: Mode,
}

impl<const ALIGNED: bool> Avx<ALIGNED> {
    fn new(mode: Mode) -> Option<Self> {
        debug_assert_eq!(mode.width(), Width::Bytes32);

        is_x86_feature_detected!("avx").then_some(Self { mode })
    }
}

impl<const ALIGNED: bool> AccessStrategy for Avx<ALIGNED> {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn load_mask(&self, region: &ScratchRegion) -> LaneMask {
        // SAFETY: AVX support is a type invariant. The mode layout keeps the 32 bytes inside
        // the region, 32-byte aligned if ALIGNED.
        unsafe { avx_load_mask::<ALIGNED>(region.at(self.mode.offset())) }
    }

    fn store_pattern(&self, region: &ScratchRegion, all_set: bool) {
        // SAFETY: AVX support is a type invariant. The mode layout keeps the 32 bytes inside
        // the region, 32-byte aligned if ALIGNED.
        unsafe { avx_store::<ALIGNED>(region.at(self.mode.offset()), pattern(all_set)) }
    }
}

/// # Safety
///
/// The processor must support AVX. `ptr` must be valid for 32 bytes and 32-byte aligned if
/// `ALIGNED`.
#[target_feature(enable = "avx")]
unsafe fn avx_load_mask<const ALIGNED: bool>(ptr: *const u8) -> LaneMask {
    let mask: LaneMask;

    if ALIGNED {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa {v}, ymmword ptr [{ptr}]",
                "vmovmskpd {mask:e}, {v}",
                ptr = in(reg) ptr,
                v = out(ymm_reg) _,
                mask = lateout(reg) mask,
                options(nostack, readonly, preserves_flags),
            );
        }
    } else {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqu {v}, ymmword ptr [{ptr}]",
                "vmovmskpd {mask:e}, {v}",
                ptr = in(reg) ptr,
                v = out(ymm_reg) _,
                mask = lateout(reg) mask,
                options(nostack, readonly, preserves_flags),
            );
        }
    }

    mask
}

/// # Safety
///
/// The processor must support AVX. `ptr` must be valid for 32 bytes and 32-byte aligned if
/// `ALIGNED`. `src` must be valid for 32 bytes and 32-byte aligned.
#[target_feature(enable = "avx")]
unsafe fn avx_store<const ALIGNED: bool>(ptr: *mut u8, src: *const u8) {
    if ALIGNED {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa {v}, ymmword ptr [{src}]",
                "vmovdqa ymmword ptr [{ptr}], {v}",
                src = in(reg) src,
                ptr = in(reg) ptr,
                v = out(ymm_reg) _,
                options(nostack, preserves_flags),
            );
        }
    } else {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa {v}, ymmword ptr [{src}]",
                "vmovdqu ymmword ptr [{ptr}], {v}",
                src = in(reg) src,
                ptr = in(reg) ptr,
                v = out(ymm_reg) _,
                options(nostack, preserves_flags),
            );
        }
    }
}

/// 64-byte accesses via `vmovdqa64`/`vmovdqu64`, lane mask via a signed compare against zero
/// into a mask register (8 x 64 bits).
#[derive(Debug)]
struct Avx512<const ALIGNED: bool> {
    // Type invariant: only constructed after AVX-512F has been detected.
    mode: Mode,
}

impl<const ALIGNED: bool> Avx512<ALIGNED> {
    fn new(mode: Mode) -> Option<Self> {
        debug_assert_eq!(mode.width(), Width::Bytes64);

        is_x86_feature_detected!("avx512f").then_some(Self { mode })
    }
}

impl<const ALIGNED: bool> AccessStrategy for Avx512<ALIGNED> {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn load_mask(&self, region: &ScratchRegion) -> LaneMask {
        // SAFETY: AVX-512F support is a type invariant. The mode layout keeps the 64 bytes
        // inside the region, 64-byte aligned if ALIGNED.
        unsafe { avx512_load_mask::<ALIGNED>(region.at(self.mode.offset())) }
    }

    fn store_pattern(&self, region: &ScratchRegion, all_set: bool) {
        // SAFETY: AVX-512F support is a type invariant. The mode layout keeps the 64 bytes
        // inside the region, 64-byte aligned if ALIGNED.
        unsafe { avx512_store::<ALIGNED>(region.at(self.mode.offset()), pattern(all_set)) }
    }
}

/// # Safety
///
/// The processor must support AVX-512F. `ptr` must be valid for 64 bytes and 64-byte aligned
/// if `ALIGNED`.
#[target_feature(enable = "avx512f")]
unsafe fn avx512_load_mask<const ALIGNED: bool>(ptr: *const u8) -> LaneMask {
    let mask: LaneMask;

    // A lane has its high bit set exactly when it is less than zero as a signed integer.
    if ALIGNED {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa64 {v}, zmmword ptr [{ptr}]",
                "vpxorq {zero}, {zero}, {zero}",
                "vpcmpgtq {k}, {zero}, {v}",
                "kmovw {mask:e}, {k}",
                ptr = in(reg) ptr,
                v = out(zmm_reg) _,
                zero = out(zmm_reg) _,
                k = out(kreg) _,
                mask = lateout(reg) mask,
                options(nostack, readonly, preserves_flags),
            );
        }
    } else {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqu64 {v}, zmmword ptr [{ptr}]",
                "vpxorq {zero}, {zero}, {zero}",
                "vpcmpgtq {k}, {zero}, {v}",
                "kmovw {mask:e}, {k}",
                ptr = in(reg) ptr,
                v = out(zmm_reg) _,
                zero = out(zmm_reg) _,
                k = out(kreg) _,
                mask = lateout(reg) mask,
                options(nostack, readonly, preserves_flags),
            );
        }
    }

    mask
}

/// # Safety
///
/// The processor must support AVX-512F. `ptr` must be valid for 64 bytes and 64-byte aligned
/// if `ALIGNED`. `src` must be valid for 64 bytes and 64-byte aligned.
#[target_feature(enable = "avx512f")]
unsafe fn avx512_store<const ALIGNED: bool>(ptr: *mut u8, src: *const u8) {
    if ALIGNED {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa64 {v}, zmmword ptr [{src}]",
                "vmovdqa64 zmmword ptr [{ptr}], {v}",
                src = in(reg) src,
                ptr = in(reg) ptr,
                v = out(zmm_reg) _,
                options(nostack, preserves_flags),
            );
        }
    } else {
        // SAFETY: Forwarding the safety requirements of the function.
        unsafe {
            asm!(
                "vmovdqa64 {v}, zmmword ptr [{src}]",
                "vmovdqu64 zmmword ptr [{ptr}], {v}",
                src = in(reg) src,
                ptr = in(reg) ptr,
                v = out(zmm_reg) _,
                options(nostack, preserves_flags),
            );
        }
    }
}
