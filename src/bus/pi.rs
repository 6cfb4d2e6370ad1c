use std::cmp::min;

use tracing::debug;

use crate::bus::mem_map::*;
use crate::bus::mi::{Intr, Mi};
use crate::util::bit_set;

// DMA busy, IO busy and error flags.
const STATUS_BUSY_MASK: u32 = 0b111;
const STATUS_INTR:      u32 = 0b1000;

#[derive(Default, Debug)]
pub struct Pi {
    cart_rom:         Box<[u8]>,
    reg_dram_addr:    u32,
    reg_cart_addr:    u32,
    reg_rd_len:       u32,
    reg_wr_len:       u32,
    reg_status:       u32,
    reg_bsd_dom1_lat: u32,
    reg_bsd_dom1_pwd: u32,
    reg_bsd_dom1_pgs: u32,
    reg_bsd_dom1_rls: u32,
    reg_bsd_dom2_lat: u32,
    reg_bsd_dom2_pwd: u32,
    reg_bsd_dom2_pgs: u32,
    reg_bsd_dom2_rls: u32,
}

impl Pi {
    /// Installs a cartridge image, truncated to the size of the ROM window.
    pub fn insert_cart(&mut self, image: &[u8]) {
        let len = min(image.len(), CART_ROM_MAX_SIZE);
        self.cart_rom = image[..len].into();
    }

    pub fn cart_rom(&self) -> &[u8] {
        &self.cart_rom
    }

    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            PI_REG_DRAM_ADDR       => self.reg_dram_addr,
            PI_REG_CART_ADDR       => self.reg_cart_addr,
            PI_REG_RD_LEN          => self.reg_rd_len,
            PI_REG_WR_LEN          => self.reg_wr_len,
            // transfers complete instantly, so never busy and never failed
            PI_REG_STATUS          => self.reg_status & !STATUS_BUSY_MASK,
            PI_REG_BSD_DOM1_LAT    => self.reg_bsd_dom1_lat,
            PI_REG_BSD_DOM1_PWD    => self.reg_bsd_dom1_pwd,
            PI_REG_BSD_DOM1_PGS    => self.reg_bsd_dom1_pgs,
            PI_REG_BSD_DOM1_RLS    => self.reg_bsd_dom1_rls,
            PI_REG_BSD_DOM2_LAT    => self.reg_bsd_dom2_lat,
            PI_REG_BSD_DOM2_PWD    => self.reg_bsd_dom2_pwd,
            PI_REG_BSD_DOM2_PGS    => self.reg_bsd_dom2_pgs,
            PI_REG_BSD_DOM2_RLS    => self.reg_bsd_dom2_rls,
            _ => 0,
        }
    }

    /// Returns true if the write touched RDRAM.
    pub fn write_reg(&mut self, addr: u32, word: u32, mi: &mut Mi, ram: &mut [u8]) -> bool {
        match addr {
            PI_REG_DRAM_ADDR       => self.reg_dram_addr = word & 0xff_ffff,
            PI_REG_CART_ADDR       => self.reg_cart_addr = word,
            PI_REG_RD_LEN          => self.reg_rd_len = word & 0xff_ffff,
            PI_REG_WR_LEN          => {
                self.dma_read(ram, word);
                self.reg_status |= STATUS_INTR;
                mi.set_interrupt(Intr::PI);
                return true;
            }
            PI_REG_STATUS          => {
                if bit_set(word, 1) {
                    self.reg_status &= !STATUS_INTR;
                    mi.clear_interrupt(Intr::PI);
                }
            }
            PI_REG_BSD_DOM1_LAT    => self.reg_bsd_dom1_lat = word & 0xff,
            PI_REG_BSD_DOM1_PWD    => self.reg_bsd_dom1_pwd = word & 0xff,
            PI_REG_BSD_DOM1_PGS    => self.reg_bsd_dom1_pgs = word & 0xf,
            PI_REG_BSD_DOM1_RLS    => self.reg_bsd_dom1_rls = word & 0x3,
            PI_REG_BSD_DOM2_LAT    => self.reg_bsd_dom2_lat = word & 0xff,
            PI_REG_BSD_DOM2_PWD    => self.reg_bsd_dom2_pwd = word & 0xff,
            PI_REG_BSD_DOM2_PGS    => self.reg_bsd_dom2_pgs = word & 0xf,
            PI_REG_BSD_DOM2_RLS    => self.reg_bsd_dom2_rls = word & 0x3,
            _ => {}
        }
        false
    }

    fn dma_read(&mut self, ram: &mut [u8], word: u32) {
        self.reg_wr_len = word & 0xff_ffff;
        // DMA transfer ROM -> main memory
        let ram_start = self.reg_dram_addr as usize;
        let rom_start = self.reg_cart_addr.wrapping_sub(CART_ROM_START) as usize;
        let length = (self.reg_wr_len + 1) as usize;
        // Some ROMs read past the end of the file...
        if rom_start >= self.cart_rom.len() || ram_start >= ram.len() {
            return;
        }
        let length = min(length, self.cart_rom.len() - rom_start);
        let length = min(length, ram.len() - ram_start);
        debug!("PI DMA: {:#x} bytes from ROM {:#x} to {:#x}",
               length, rom_start, ram_start);
        ram[ram_start..ram_start + length]
            .copy_from_slice(&self.cart_rom[rom_start..rom_start + length]);
    }
}
