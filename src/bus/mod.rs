pub mod mem_map;
pub mod mem;
pub mod mi;
pub mod rcp;
mod vi;
mod ai;
mod pi;
mod si;

use std::cmp::min;

use tracing::trace;

use self::mem::{MemFmt, Memory};
use self::mem_map::*;
use self::vi::Vi;
use self::ai::Ai;
use self::pi::Pi;
use self::si::Si;
use self::mi::{Intr, Mi};
use self::rcp::{DpRegs, FrameBuffer, SpRegs};
use crate::cpu::icache::ICache;

/// The raw byte buffers of the physical address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Rdram,
    CartRom,
    SpDmem,
    SpImem,
    PifRam,
}

/// The hardware register windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    Sp,
    Dp,
    Mi,
    Vi,
    Ai,
    Pi,
    Si,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mapping {
    /// A buffer and the offset into it.
    Memory(Region, u32),
    /// A register block and the physical address of the access.
    Register(Block, u32),
    Unmapped,
}

/// Strips the KSEG1 or KSEG0 window off a virtual address.
#[inline]
pub fn fold_segment(addr: u32) -> u32 {
    if addr >= KSEG1_START {
        addr - KSEG1_START
    } else if addr >= KSEG0_START {
        addr - KSEG0_START
    } else {
        addr
    }
}

pub fn resolve(addr: u32) -> Mapping {
    let addr = fold_segment(addr);
    match addr {
        RDRAM_START      ..= RDRAM_END      => Mapping::Memory(Region::Rdram, addr - RDRAM_START),
        SP_DMEM_START    ..= SP_DMEM_END    => Mapping::Memory(Region::SpDmem, addr - SP_DMEM_START),
        SP_IMEM_START    ..= SP_IMEM_END    => Mapping::Memory(Region::SpImem, addr - SP_IMEM_START),
        CART_ROM_START   ..= CART_ROM_END   => Mapping::Memory(Region::CartRom, addr - CART_ROM_START),
        PIF_RAM_START    ..= PIF_RAM_END    => Mapping::Memory(Region::PifRam, addr - PIF_RAM_START),
        PIF_RAM_HW_START ..= PIF_RAM_HW_END => Mapping::Memory(Region::PifRam, addr - PIF_RAM_HW_START),
        SP_REG_START     ..= SP_REG_END     => Mapping::Register(Block::Sp, addr),
        DP_REG_START     ..= DP_REG_END     => Mapping::Register(Block::Dp, addr),
        MI_REG_START     ..= MI_REG_END     => Mapping::Register(Block::Mi, addr),
        VI_REG_START     ..= VI_REG_END     => Mapping::Register(Block::Vi, addr),
        AI_REG_START     ..= AI_REG_END     => Mapping::Register(Block::Ai, addr),
        PI_REG_START     ..= PI_REG_END     => Mapping::Register(Block::Pi, addr),
        SI_REG_START     ..= SI_REG_END     => Mapping::Register(Block::Si, addr),
        _ => Mapping::Unmapped,
    }
}

/// Instruction cache key of a buffer location.  A buffer seen through more
/// than one window still has a single key per word.
fn cache_key(region: Region, offset: u32) -> u32 {
    let base = match region {
        Region::Rdram   => RDRAM_START,
        Region::CartRom => CART_ROM_START,
        Region::SpDmem  => SP_DMEM_START,
        Region::SpImem  => SP_IMEM_START,
        Region::PifRam  => PIF_RAM_START,
    };
    base + offset
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    pub unmapped_reads:  u64,
    pub unmapped_writes: u64,
}

/// The parts of the bus the RSP works on directly.
pub struct RspView<'a> {
    pub sp:     &'a mut SpRegs,
    pub imem:   &'a [u8],
    pub dmem:   &'a mut [u8],
    pub icache: &'a mut ICache,
}

pub struct Bus {
    ram:     Box<[u8]>,
    dmem:    Box<[u8]>,
    imem:    Box<[u8]>,
    pif_ram: Box<[u8]>,
    sp:      SpRegs,
    dp:      DpRegs,
    mi:      Mi,
    vi:      Vi,
    ai:      Ai,
    pi:      Pi,
    si:      Si,
    icache:  ICache,
    stats:   BusStats,
}

impl Bus {
    pub fn new(icache: bool) -> Bus {
        Bus::with_framebuffer(icache, FrameBuffer::new())
    }

    /// Scans out into `framebuffer`, which the host may already hold.
    pub fn with_framebuffer(icache: bool, framebuffer: FrameBuffer) -> Bus {
        Bus {
            ram:     vec![0; RDRAM_SIZE].into_boxed_slice(),
            dmem:    vec![0; SP_MEM_SIZE].into_boxed_slice(),
            imem:    vec![0; SP_MEM_SIZE].into_boxed_slice(),
            pif_ram: vec![0; PIF_RAM_SIZE].into_boxed_slice(),
            sp:      SpRegs::default(),
            dp:      DpRegs::with_framebuffer(framebuffer),
            mi:      Mi::default(),
            vi:      Vi::default(),
            ai:      Ai::default(),
            pi:      Pi::default(),
            si:      Si::default(),
            icache:  ICache::new(icache),
            stats:   BusStats::default(),
        }
    }

    pub fn power_on_reset(&mut self) {
        self.sp.power_on_reset();
    }

    /// Puts a cartridge image into the ROM window and mirrors its start
    /// into RDRAM, standing in for the boot code's copy.
    pub fn insert_cart(&mut self, image: &[u8]) {
        self.pi.insert_cart(image);
        let mirror = min(image.len(), self.ram.len());
        self.ram[..mirror].copy_from_slice(&image[..mirror]);
        self.icache.clear();
    }

    fn buffer(&self, region: Region) -> &[u8] {
        match region {
            Region::Rdram   => &self.ram[..],
            Region::CartRom => self.pi.cart_rom(),
            Region::SpDmem  => &self.dmem[..],
            Region::SpImem  => &self.imem[..],
            Region::PifRam  => &self.pif_ram[..],
        }
    }

    fn buffer_mut(&mut self, region: Region) -> Option<&mut [u8]> {
        match region {
            Region::Rdram   => Some(&mut self.ram[..]),
            Region::CartRom => None,
            Region::SpDmem  => Some(&mut self.dmem[..]),
            Region::SpImem  => Some(&mut self.imem[..]),
            Region::PifRam  => Some(&mut self.pif_ram[..]),
        }
    }

    fn read_reg(&mut self, block: Block, addr: u32) -> u32 {
        match block {
            Block::Sp => self.sp.read_reg(addr),
            Block::Dp => self.dp.read_reg(addr),
            Block::Mi => self.mi.read_reg(addr),
            Block::Vi => self.vi.read_reg(addr),
            Block::Ai => self.ai.read_reg(addr),
            Block::Pi => self.pi.read_reg(addr),
            Block::Si => self.si.read_reg(addr),
        }
    }

    fn write_reg(&mut self, block: Block, addr: u32, word: u32) {
        match block {
            Block::Sp => self.sp.write_reg(addr, word, &mut self.mi),
            Block::Dp => self.dp.write_reg(addr, word, &mut self.mi, &self.ram, &self.dmem),
            Block::Mi => self.mi.write_reg(addr, word),
            Block::Vi => self.vi.write_reg(addr, word, &mut self.mi),
            Block::Ai => self.ai.write_reg(addr, word),
            Block::Pi => {
                if self.pi.write_reg(addr, word, &mut self.mi, &mut self.ram) {
                    self.icache.clear();
                }
            }
            Block::Si => self.si.write_reg(addr, word, &mut self.mi),
        }
    }

    pub fn read_u8(&mut self, addr: u32) -> u8 { self.load(addr) }
    pub fn read_u16(&mut self, addr: u32) -> u16 { self.load(addr) }
    pub fn read_u32(&mut self, addr: u32) -> u32 { self.load(addr) }
    pub fn write_u8(&mut self, addr: u32, value: u8) { self.store(addr, value) }
    pub fn write_u16(&mut self, addr: u32, value: u16) { self.store(addr, value) }
    pub fn write_u32(&mut self, addr: u32, value: u32) { self.store(addr, value) }

    /// Instruction fetch.  Words from the backing buffers go through the
    /// instruction cache.
    pub fn fetch_instr(&mut self, addr: u32) -> u32 {
        let addr = addr & !0b11;
        let key = match resolve(addr) {
            Mapping::Memory(region, offset) => cache_key(region, offset),
            _ => return self.load(addr),
        };
        if let Some(word) = self.icache.lookup(key) {
            return word;
        }
        let word = self.load(addr);
        self.icache.fill(key, word);
        word
    }

    /// Refreshes the display from the VI origin and flags the VI interrupt.
    pub fn vi_cycle(&mut self) {
        self.vi.scanout(&self.ram, self.dp.framebuffer());
        self.mi.set_interrupt(Intr::VI);
    }

    pub fn dp_drain(&mut self) {
        self.dp.drain(&mut self.mi, &self.ram, &self.dmem);
    }

    pub fn rsp_view(&mut self) -> RspView<'_> {
        RspView {
            sp:     &mut self.sp,
            imem:   &self.imem,
            dmem:   &mut self.dmem,
            icache: &mut self.icache,
        }
    }

    pub fn rsp_halted(&self) -> bool {
        self.sp.is_halted()
    }

    pub fn pif_ram(&self) -> &[u8] {
        &self.pif_ram
    }

    pub fn pif_ram_mut(&mut self) -> &mut [u8] {
        &mut self.pif_ram
    }

    pub fn sp_dmem(&self) -> &[u8] {
        &self.dmem
    }

    pub fn sp_imem(&self) -> &[u8] {
        &self.imem
    }

    /// Overwrites the writable memories from a snapshot.  The slices must
    /// have the sizes of the buffers they replace.
    pub fn restore_memories(&mut self, rdram: &[u8], dmem: &[u8], imem: &[u8], pif_ram: &[u8]) {
        self.ram.copy_from_slice(rdram);
        self.dmem.copy_from_slice(dmem);
        self.imem.copy_from_slice(imem);
        self.pif_ram.copy_from_slice(pif_ram);
        self.icache.clear();
    }

    pub fn cart_rom(&self) -> &[u8] {
        self.pi.cart_rom()
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn dp(&self) -> &DpRegs {
        &self.dp
    }

    pub fn mi(&self) -> &Mi {
        &self.mi
    }

    pub fn icache(&self) -> &ICache {
        &self.icache
    }

    pub fn stats(&self) -> BusStats {
        self.stats
    }
}

impl Default for Bus {
    fn default() -> Bus {
        Bus::new(true)
    }
}

impl Memory for Bus {
    fn load<T: MemFmt>(&mut self, addr: u32) -> T {
        let addr = addr & !(T::SIZE as u32 - 1);
        match resolve(addr) {
            Mapping::Memory(region, offset) => {
                let buf = self.buffer(region);
                let offset = offset as usize;
                // only the cartridge can be shorter than its window
                if offset + T::SIZE <= buf.len() {
                    T::read_from(&buf[offset..])
                } else {
                    T::zero()
                }
            }
            Mapping::Register(block, phys) => {
                let word = self.read_reg(block, phys & !0b11);
                T::from_word(word, phys)
            }
            Mapping::Unmapped => {
                trace!("unmapped read at {:#010x}", addr);
                self.stats.unmapped_reads += 1;
                T::zero()
            }
        }
    }

    fn store<T: MemFmt>(&mut self, addr: u32, value: T) {
        let addr = addr & !(T::SIZE as u32 - 1);
        match resolve(addr) {
            Mapping::Memory(region, offset) => {
                let start = offset as usize;
                let written = match self.buffer_mut(region) {
                    Some(buf) if start + T::SIZE <= buf.len() => {
                        T::write_to(&mut buf[start..], value);
                        true
                    }
                    _ => false,
                };
                if written {
                    self.icache.invalidate(cache_key(region, offset));
                } else {
                    trace!("dropped write of {:#x} to {:?} at {:#010x}", value, region, addr);
                    self.stats.unmapped_writes += 1;
                }
            }
            // registers only latch full words
            Mapping::Register(block, phys) if T::SIZE == 4 => {
                self.write_reg(block, phys, value.to_word());
            }
            Mapping::Register(..) | Mapping::Unmapped => {
                trace!("unmapped write of {:#x} at {:#010x}", value, addr);
                self.stats.unmapped_writes += 1;
            }
        }
    }
}
