//! Cartridge images: byte order normalization, header parsing and CIC detection.

use std::fmt;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder as _};
use tracing::{info, warn};

use crate::error::{EmuError, Result};
use crate::util::read_bin;

pub const HEADER_SIZE: usize = 0x40;

/// Layout of the image on disk, told apart by its first word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// `.z64`, already what the console sees.
    BigEndian,
    /// `.v64`, bytes swapped in pairs.
    ByteSwapped,
    /// `.n64`, every word reversed.
    LittleEndian,
    Unknown,
}

impl ByteOrder {
    pub fn detect(image: &[u8]) -> ByteOrder {
        match image {
            [0x80, 0x37, ..] => ByteOrder::BigEndian,
            [0x37, 0x80, ..] => ByteOrder::ByteSwapped,
            [0x40, 0x12, 0x37, 0x80, ..] => ByteOrder::LittleEndian,
            _ => ByteOrder::Unknown,
        }
    }

    /// Rewrites `image` in place to big-endian.  A trailing partial word
    /// is left alone.
    pub fn normalize(self, image: &mut [u8]) {
        match self {
            ByteOrder::ByteSwapped => for word in image.chunks_exact_mut(4) {
                word.swap(0, 1);
                word.swap(2, 3);
            },
            ByteOrder::LittleEndian => for word in image.chunks_exact_mut(4) {
                word.reverse();
            },
            ByteOrder::BigEndian | ByteOrder::Unknown => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RomHeader {
    pub pi_config:    u32,
    pub clock_rate:   u32,
    pub entry_point:  u32,
    pub release:      u32,
    pub crc1:         u32,
    pub crc2:         u32,
    pub name:         String,
    pub manufacturer: u8,
    pub cartridge_id: String,
    pub country:      u8,
}

impl RomHeader {
    fn parse(header: &[u8]) -> RomHeader {
        let ascii = |bytes: &[u8]| {
            String::from_utf8_lossy(bytes)
                .trim_end_matches(|c: char| c == '\0' || c == ' ')
                .to_string()
        };
        RomHeader {
            pi_config:    BigEndian::read_u32(&header[0..]),
            clock_rate:   BigEndian::read_u32(&header[4..]),
            entry_point:  BigEndian::read_u32(&header[8..]),
            release:      BigEndian::read_u32(&header[12..]),
            crc1:         BigEndian::read_u32(&header[16..]),
            crc2:         BigEndian::read_u32(&header[20..]),
            name:         ascii(&header[32..52]),
            manufacturer: header[60],
            cartridge_id: ascii(&header[61..63]),
            country:      header[63],
        }
    }
}

impl fmt::Display for RomHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Name:         {}", self.name)?;
        writeln!(f, "Cartridge ID: {} ({})", self.cartridge_id, self.country as char)?;
        writeln!(f, "Entry point:  {:#010x}", self.entry_point)?;
        write!(f,   "CRC:          {:08x} {:08x}", self.crc1, self.crc2)
    }
}

/// The boot chip on the cartridge.  Each one seeds PIF RAM differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cic {
    Nus5101,
    Nus6101,
    Nus6102,
    Nus6103,
    Nus6105,
    Nus6106,
    Nus8303,
}

impl Cic {
    /// Tells the chip apart by the CRC32 of the boot code it checks.
    pub fn detect(image: &[u8]) -> Option<Cic> {
        if image.len() < 0x1000 {
            return None;
        }
        if crc32fast::hash(&image[0x40..0xc00]) == 0x587b_d543 {
            return Some(Cic::Nus5101);
        }
        match crc32fast::hash(&image[0x40..0x1000]) {
            0x6170_a4a1 => Some(Cic::Nus6101),
            0x90bb_6cb5 => Some(Cic::Nus6102),
            0x0b05_0ee0 => Some(Cic::Nus6103),
            0x98bc_2c86 => Some(Cic::Nus6105),
            0xacc8_580a => Some(Cic::Nus6106),
            0x0e01_8159 => Some(Cic::Nus8303),
            _           => None,
        }
    }

    pub fn seed(self) -> u32 {
        match self {
            Cic::Nus5101 => 0x0000_ac00,
            Cic::Nus6101 => 0x0006_3f3f,
            Cic::Nus6102 => 0x0002_3f3f,
            Cic::Nus6103 => 0x0002_783f,
            Cic::Nus6105 => 0x0002_913f,
            Cic::Nus6106 => 0x0002_853f,
            Cic::Nus8303 => 0x0000_dd00,
        }
    }
}

#[derive(Clone)]
pub struct Rom {
    header:     RomHeader,
    byte_order: ByteOrder,
    cic:        Option<Cic>,
    data:       Vec<u8>,
}

impl fmt::Debug for Rom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rom")
            .field("header", &self.header)
            .field("byte_order", &self.byte_order)
            .field("cic", &self.cic)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Rom {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Rom> {
        Rom::from_bytes(read_bin(path)?)
    }

    pub fn from_bytes(mut data: Vec<u8>) -> Result<Rom> {
        if data.len() < HEADER_SIZE {
            return Err(EmuError::RomTooSmall(data.len()));
        }
        let byte_order = ByteOrder::detect(&data);
        if byte_order == ByteOrder::Unknown {
            warn!("unknown ROM byte order {:02x?}, loading as is", &data[..4]);
        }
        byte_order.normalize(&mut data);

        let header = RomHeader::parse(&data[..HEADER_SIZE]);
        let cic = Cic::detect(&data);
        match cic {
            Some(cic) => info!("detected CIC {:?}", cic),
            None      => warn!("unknown CIC, PIF RAM will not be seeded"),
        }
        info!("loaded ROM \"{}\" ({} bytes, {:?}), entry point {:#010x}",
              header.name, data.len(), byte_order, header.entry_point);

        Ok(Rom { header, byte_order, cic, data })
    }

    pub fn header(&self) -> &RomHeader {
        &self.header
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn cic(&self) -> Option<Cic> {
        self.cic
    }

    pub fn cic_seed(&self) -> Option<u32> {
        self.cic.map(Cic::seed)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
