//! Miscellaneous utilities for the emulator.

use std::fs;
use std::path::Path;

use crate::error::Result;

pub fn read_bin<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    Ok(fs::read(path)?)
}

#[inline]
pub fn bit_set(value: u32, bit: u32) -> bool {
    value & (1 << bit) != 0
}

/// Many RCP status registers take a pair of write bits per flag: one that
/// clears it and one that sets it.  Clear wins if both are given.
#[inline]
pub fn clear_or_set_bit(target: &mut u32, bit: u32,
                        value: u32, clear_bit: u32, set_bit: u32) {
    if value & (1 << clear_bit) != 0 {
        *target &= !(1 << bit);
    } else if value & (1 << set_bit) != 0 {
        *target |= 1 << bit;
    }
}
