//! The "nBits" compact encoding of a 256-bit target.
//!
//! Layout: one byte of size (in bytes) followed by a 23-bit mantissa and a sign bit.
//! Negative and overflowing encodings are representable on the wire but never valid
//! targets, so decoding reports them as errors instead of clamping.

use primitive_types::U256;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactError {
    #[error("compact target {0:#010x} has the sign bit set")]
    Negative(u32),

    #[error("compact target {0:#010x} does not fit in 256 bits")]
    Overflow(u32),

    #[error("compact target {0:#010x} decodes to zero")]
    Zero(u32),
}

/// Decode compact bits into a target.
pub fn target_from_compact(bits: u32) -> Result<U256, CompactError> {
    let size = bits >> 24;
    let mut word = bits & 0x007f_ffff;

    if size <= 3 {
        word >>= 8 * (3 - size);
    }

    if word != 0 && bits & 0x0080_0000 != 0 {
        return Err(CompactError::Negative(bits));
    }
    if word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32)) {
        return Err(CompactError::Overflow(bits));
    }

    let target = if size <= 3 { U256::from(word) } else { U256::from(word) << (8 * (size - 3) as usize) };
    if target.is_zero() {
        return Err(CompactError::Zero(bits));
    }
    Ok(target)
}

/// Encode a target into compact bits, rounding the mantissa down.
pub fn compact_from_target(target: U256) -> u32 {
    let mut size = (target.bits() as u32 + 7) / 8;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (target >> (8 * (size - 3) as usize)).low_u64() as u32
    };

    // The mantissa's top bit is the sign; move into the next size instead.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }
    compact | (size << 24)
}
