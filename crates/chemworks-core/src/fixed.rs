use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for energy
/// so that every peer debits exactly the same amount each tick.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and the network packet.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Number of whole `divisor`s contained in `numerator`, saturating at
/// `u32::MAX`.
///
/// Non-positive numerators yield 0. A non-positive divisor is treated as
/// "no limit" and yields `u32::MAX`.
#[inline]
pub fn whole_quotient(numerator: Fixed64, divisor: Fixed64) -> u32 {
    if numerator <= Fixed64::ZERO {
        return 0;
    }
    if divisor <= Fixed64::ZERO {
        return u32::MAX;
    }
    match numerator.checked_div(divisor) {
        Some(q) => q.to_num::<i64>().clamp(0, u32::MAX as i64) as u32,
        None => u32::MAX,
    }
}
