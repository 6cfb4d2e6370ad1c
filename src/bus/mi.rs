use bitflags::bitflags;

use crate::bus::mem_map::*;
use crate::util::bit_set;

pub const MI_VERSION: u32 = 0x0202_0102;

bitflags! {
    /// Interrupt lines collected by the MIPS interface.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Intr: u32 {
        const SP = 0x01;
        const SI = 0x02;
        const AI = 0x04;
        const VI = 0x08;
        const PI = 0x10;
        const DP = 0x20;
    }
}

// Order of the clear/set bit pairs in a mask write.
const MASK_ORDER: [Intr; 6] = [Intr::SP, Intr::SI, Intr::AI, Intr::VI, Intr::PI, Intr::DP];

/// Interrupt bookkeeping only: pending lines are tracked and can be read
/// back, but nothing is delivered to the CPU.
#[derive(Default, Debug)]
pub struct Mi {
    reg_mode:      u32,
    reg_intr:      Intr,
    reg_intr_mask: Intr,
}

impl Mi {
    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            MI_REG_MODE      => self.reg_mode,
            MI_REG_VERSION   => MI_VERSION,
            MI_REG_INTR      => self.reg_intr.bits(),
            MI_REG_INTR_MASK => self.reg_intr_mask.bits(),
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32) {
        match addr {
            MI_REG_MODE      => {
                // init length and the mode flags latch, the clear bits don't
                self.reg_mode = word & 0x7f;
                if bit_set(word, 11) {
                    self.clear_interrupt(Intr::DP);
                }
            }
            MI_REG_INTR_MASK => {
                for (i, line) in MASK_ORDER.iter().enumerate() {
                    let i = i as u32;
                    if bit_set(word, 2 * i) {
                        self.reg_intr_mask.remove(*line);
                    } else if bit_set(word, 2 * i + 1) {
                        self.reg_intr_mask.insert(*line);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn set_interrupt(&mut self, intr: Intr) {
        self.reg_intr.insert(intr);
    }

    pub fn clear_interrupt(&mut self, intr: Intr) {
        self.reg_intr.remove(intr);
    }

    pub fn pending(&self) -> Intr {
        self.reg_intr
    }
}
