use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use parking_lot::Mutex;
use tracing::debug;

use crate::bus::mem_map::*;
use crate::bus::mi::{Intr, Mi};
use crate::util::{bit_set, clear_or_set_bit};

pub const FB_WIDTH:  usize = 640;
pub const FB_HEIGHT: usize = 480;
pub const FB_BYTES:  usize = FB_WIDTH * FB_HEIGHT * 4;

/// The RGBA8888 image handed to the display.  Rows are always `FB_WIDTH`
/// pixels wide.  Cloning shares the same pixels.
#[derive(Clone, Debug)]
pub struct FrameBuffer(Arc<Mutex<Box<[u8]>>>);

impl FrameBuffer {
    pub fn new() -> FrameBuffer {
        FrameBuffer(Arc::new(Mutex::new(vec![0; FB_BYTES].into_boxed_slice())))
    }

    pub fn with_locked<F, R>(&self, f: F) -> R where F: FnOnce(&mut [u8]) -> R {
        let mut guard = self.0.lock();
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().to_vec()
    }

    pub fn clear(&self) {
        self.0.lock().fill(0);
    }
}

impl Default for FrameBuffer {
    fn default() -> FrameBuffer {
        FrameBuffer::new()
    }
}

// SP ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SpRegs {
    reg_mem_addr:  u32,
    reg_dram_addr: u32,
    reg_rd_len:    u32,
    reg_wr_len:    u32,
    reg_status:    u32,
    reg_dma_full:  u32,
    reg_dma_busy:  u32,
    reg_semaphore: bool,
    reg_pc:        u32,
    reg_ibist:     u32,
}

impl Default for SpRegs {
    fn default() -> SpRegs {
        SpRegs {
            reg_mem_addr:  0,
            reg_dram_addr: 0,
            reg_rd_len:    0,
            reg_wr_len:    0,
            reg_status:    0x1,
            reg_dma_full:  0,
            reg_dma_busy:  0,
            reg_semaphore: false,
            reg_pc:        0,
            reg_ibist:     0,
        }
    }
}

impl SpRegs {
    pub fn power_on_reset(&mut self) {
        self.reg_status |= 0x1;
    }

    pub fn read_reg(&mut self, addr: u32) -> u32 {
        match addr {
            SP_REG_MEM_ADDR   => self.reg_mem_addr,
            SP_REG_DRAM_ADDR  => self.reg_dram_addr,
            SP_REG_RD_LEN     => self.reg_rd_len,
            SP_REG_WR_LEN     => self.reg_wr_len,
            // guests always see a halted RSP
            SP_REG_STATUS     => self.reg_status | 0x1,
            SP_REG_DMA_FULL   => self.reg_dma_full,
            SP_REG_DMA_BUSY   => self.reg_dma_busy,
            SP_REG_SEMAPHORE  => std::mem::replace(&mut self.reg_semaphore, true) as u32,
            SP_REG_PC         => self.reg_pc,
            SP_REG_IBIST      => self.reg_ibist,
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32, mi: &mut Mi) {
        match addr {
            SP_REG_MEM_ADDR   => self.reg_mem_addr = word & 0x1fff,
            SP_REG_DRAM_ADDR  => self.reg_dram_addr = word & 0xff_ffff,
            SP_REG_RD_LEN     => self.reg_rd_len = word,
            SP_REG_WR_LEN     => self.reg_wr_len = word,
            SP_REG_STATUS     => {
                // halt
                clear_or_set_bit(&mut self.reg_status, 0, word, 0, 1);
                if bit_set(word, 0) {
                    debug!("RSP started at {:#05x}", self.reg_pc);
                }
                // broke
                if bit_set(word, 2) {
                    self.reg_status &= !0x2;
                }
                if bit_set(word, 3) {
                    mi.clear_interrupt(Intr::SP);
                }
                if bit_set(word, 4) {
                    mi.set_interrupt(Intr::SP);
                }
                // single step
                clear_or_set_bit(&mut self.reg_status, 5, word, 5, 6);
                // interrupt on break
                clear_or_set_bit(&mut self.reg_status, 6, word, 7, 8);
                // signals
                for i in 7..15 {
                    clear_or_set_bit(&mut self.reg_status, i, word,
                                     2*i - 5, 2*i - 4);
                }
            }
            SP_REG_SEMAPHORE  => self.reg_semaphore = false,
            SP_REG_PC         => self.reg_pc = word & 0xffc,
            SP_REG_IBIST      => self.reg_ibist = word & 0x7,
            _ => {}
        }
    }

    /// The real halt flag, which decides whether the driving loop steps the RSP.
    pub fn is_halted(&self) -> bool {
        bit_set(self.reg_status, 0)
    }

    pub fn pc(&self) -> u32 {
        self.reg_pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.reg_pc = pc & 0xffc;
    }
}

// DP ---------------------------------------------------------------------------

const DP_STATUS_XBUS: u32 = 0;

/// RDP commands, identified by bits 61..56 of the first command word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Nop,
    Triangle { shade: bool, texture: bool, zbuffer: bool },
    TextureRectangle,
    SyncLoad,
    SyncPipe,
    SyncTile,
    SyncFull,
    SetOtherModes,
    FillRectangle,
    SetFillColor,
    SetColorImage,
    Other(u8),
}

impl Command {
    pub fn from_id(id: u8) -> Command {
        match id & 0x3f {
            0x00        => Command::Nop,
            0x08..=0x0f => Command::Triangle {
                shade:   id & 0b100 != 0,
                texture: id & 0b010 != 0,
                zbuffer: id & 0b001 != 0,
            },
            0x24 | 0x25 => Command::TextureRectangle,
            0x26        => Command::SyncLoad,
            0x27        => Command::SyncPipe,
            0x28        => Command::SyncTile,
            0x29        => Command::SyncFull,
            0x2f        => Command::SetOtherModes,
            0x36        => Command::FillRectangle,
            0x37        => Command::SetFillColor,
            0x3f        => Command::SetColorImage,
            other       => Command::Other(other),
        }
    }

    /// Length in bytes, including the coefficient blocks of triangles.
    pub fn length(self) -> u32 {
        match self {
            Command::Triangle { shade, texture, zbuffer } => {
                32 + if shade { 64 } else { 0 }
                   + if texture { 64 } else { 0 }
                   + if zbuffer { 16 } else { 0 }
            }
            Command::TextureRectangle => 16,
            _ => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub total:      u64,
    pub triangles:  u64,
    pub rectangles: u64,
    pub syncs:      u64,
}

#[derive(Debug, Default)]
pub struct DpRegs {
    reg_start:         u32,
    reg_end:           u32,
    reg_current:       u32,
    reg_status:        u32,
    reg_clock:         u32,
    reg_bufbusy:       u32,
    reg_pipebusy:      u32,
    reg_tmem:          u32,
    /// Number of times the command buffer was processed.
    pub process_count: u64,
    pub commands:      CommandStats,
    framebuffer:       FrameBuffer,
}

impl DpRegs {
    pub fn with_framebuffer(framebuffer: FrameBuffer) -> DpRegs {
        DpRegs {
            reg_start:     0,
            reg_end:       0,
            reg_current:   0,
            reg_status:    0,
            reg_clock:     0,
            reg_bufbusy:   0,
            reg_pipebusy:  0,
            reg_tmem:      0,
            process_count: 0,
            commands:      CommandStats::default(),
            framebuffer,
        }
    }

    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            DPC_REG_START    => self.reg_start,
            DPC_REG_END      => self.reg_end,
            DPC_REG_CURRENT  => self.reg_current,
            DPC_REG_STATUS   => self.reg_status,
            DPC_REG_CLOCK    => self.reg_clock,
            DPC_REG_BUFBUSY  => self.reg_bufbusy,
            DPC_REG_PIPEBUSY => self.reg_pipebusy,
            DPC_REG_TMEM     => self.reg_tmem,
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32, mi: &mut Mi,
                     ram: &[u8], dmem: &[u8]) {
        match addr {
            DPC_REG_START    => {
                self.reg_start = word & 0xff_ffff;
                self.reg_current = self.reg_start;
            }
            DPC_REG_END      => {
                self.reg_end = word & 0xff_ffff;
                self.process_commands(mi, ram, dmem);
            }
            DPC_REG_STATUS   => {
                clear_or_set_bit(&mut self.reg_status, 0, word, 0, 1);
                clear_or_set_bit(&mut self.reg_status, 1, word, 2, 3);
                clear_or_set_bit(&mut self.reg_status, 2, word, 4, 5);
                if bit_set(word, 6) {
                    self.reg_tmem = 0;
                }
                if bit_set(word, 7) {
                    self.reg_pipebusy = 0;
                }
                if bit_set(word, 8) {
                    self.reg_bufbusy = 0;
                }
                if bit_set(word, 9) {
                    self.reg_clock = 0;
                }
            }
            _ => {}
        }
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    /// Processes whatever is left between CURRENT and END.
    pub fn drain(&mut self, mi: &mut Mi, ram: &[u8], dmem: &[u8]) {
        if self.reg_current != self.reg_end {
            self.process_commands(mi, ram, dmem);
        }
    }

    fn process_commands(&mut self, mi: &mut Mi, ram: &[u8], dmem: &[u8]) {
        self.process_count += 1;
        let (buf, mask) = if bit_set(self.reg_status, DP_STATUS_XBUS) {
            (dmem, 0xfff)
        } else {
            (ram, 0xff_ffff)
        };
        let mut current = self.reg_current;
        let mut count = 0;
        while current < self.reg_end {
            let offset = (current & mask) as usize;
            if offset + 8 > buf.len() {
                break;
            }
            let word = BigEndian::read_u64(&buf[offset..]);
            let command = Command::from_id((word >> 56) as u8);
            self.record(command, mi);
            count += 1;
            current += command.length();
        }
        debug!("RDP: {} commands in {:#x}..{:#x}", count, self.reg_current, self.reg_end);
        self.reg_current = self.reg_end;
    }

    fn record(&mut self, command: Command, mi: &mut Mi) {
        let stats = &mut self.commands;
        stats.total += 1;
        match command {
            Command::Triangle { .. } => stats.triangles += 1,
            Command::TextureRectangle | Command::FillRectangle => stats.rectangles += 1,
            Command::SyncFull => {
                stats.syncs += 1;
                mi.set_interrupt(Intr::DP);
            }
            Command::SyncLoad | Command::SyncPipe | Command::SyncTile => stats.syncs += 1,
            _ => {}
        }
    }
}
