/// Identifies a specific processor.
///
/// This matches the numeric identifier used by standard tooling of the operating system
/// (e.g. `taskset` or `/proc/cpuinfo` on Linux). The values are not guaranteed to be contiguous.
pub type CpuId = u32;

/// One bit per lane of a wide load, holding the high (sign) bit of that lane.
///
/// Bit 0 corresponds to the lane at the lowest address.
pub type LaneMask = u32;
