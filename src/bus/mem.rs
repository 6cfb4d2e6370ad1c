use std::fmt;

use byteorder::{BigEndian, ByteOrder};

/// Abstracts the different widths we can load and store.
pub trait MemFmt: Copy + fmt::LowerHex {
    const SIZE: usize;
    /// Reads a big-endian value from the start of `buf`.
    fn read_from(buf: &[u8]) -> Self;
    /// Writes a big-endian value to the start of `buf`.
    fn write_to(buf: &mut [u8], value: Self);
    /// Picks the lane at `addr` out of a 32-bit register value.
    fn from_word(word: u32, addr: u32) -> Self;
    fn to_word(self) -> u32;
    fn zero() -> Self;
}

impl MemFmt for u8 {
    const SIZE: usize = 1;
    fn read_from(buf: &[u8]) -> u8 { buf[0] }
    fn write_to(buf: &mut [u8], value: u8) { buf[0] = value }
    fn from_word(word: u32, addr: u32) -> u8 {
        let shift = 8 * (3 - (addr & 0b11));  // byte 0: shift 24
        (word >> shift) as u8
    }
    fn to_word(self) -> u32 { self as u32 }
    fn zero() -> u8 { 0 }
}

impl MemFmt for u16 {
    const SIZE: usize = 2;
    fn read_from(buf: &[u8]) -> u16 { BigEndian::read_u16(buf) }
    fn write_to(buf: &mut [u8], value: u16) { BigEndian::write_u16(buf, value) }
    fn from_word(word: u32, addr: u32) -> u16 {
        let shift = 8 * (2 - (addr & 0b10));  // halfword 0: shift 16
        (word >> shift) as u16
    }
    fn to_word(self) -> u32 { self as u32 }
    fn zero() -> u16 { 0 }
}

impl MemFmt for u32 {
    const SIZE: usize = 4;
    fn read_from(buf: &[u8]) -> u32 { BigEndian::read_u32(buf) }
    fn write_to(buf: &mut [u8], value: u32) { BigEndian::write_u32(buf, value) }
    fn from_word(word: u32, _addr: u32) -> u32 { word }
    fn to_word(self) -> u32 { self }
    fn zero() -> u32 { 0 }
}

/// What the instruction executor needs from the address space.
///
/// Addresses are virtual; implementors fold the segments and force the
/// natural alignment of the width.  Neither direction can fail.
pub trait Memory {
    fn load<T: MemFmt>(&mut self, addr: u32) -> T;
    fn store<T: MemFmt>(&mut self, addr: u32, value: T);
}
