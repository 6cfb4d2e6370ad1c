//! In-memory machine snapshots and the numbered slots they are kept in.

use std::fmt;

use crate::bus::mem_map::{PIF_RAM_SIZE, RDRAM_SIZE, SP_MEM_SIZE};
use crate::error::{EmuError, Result};

pub const SLOT_COUNT: usize = 10;

/// Main CPU registers at the time of the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuState {
    pub pc:  u32,
    pub gpr: [u32; 32],
    pub fpr: [u32; 32],
    pub hi:  u32,
    pub lo:  u32,
    pub cp0: [u32; 32],
}

#[derive(Clone)]
pub struct SaveState {
    pub cpu:          CpuState,
    pub rdram:        Box<[u8]>,
    pub sp_dmem:      Box<[u8]>,
    pub sp_imem:      Box<[u8]>,
    pub pif_ram:      Box<[u8]>,
    pub instructions: u64,
    checksum:         u32,
}

impl fmt::Debug for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SaveState")
            .field("pc", &format_args!("{:#010x}", self.cpu.pc))
            .field("instructions", &self.instructions)
            .field("checksum", &format_args!("{:08x}", self.checksum))
            .finish()
    }
}

impl SaveState {
    pub fn new(cpu: CpuState, rdram: &[u8], sp_dmem: &[u8], sp_imem: &[u8],
               pif_ram: &[u8], instructions: u64) -> SaveState {
        let mut state = SaveState {
            cpu,
            rdram:   rdram.into(),
            sp_dmem: sp_dmem.into(),
            sp_imem: sp_imem.into(),
            pif_ram: pif_ram.into(),
            instructions,
            checksum: 0,
        };
        state.checksum = state.calculate_checksum();
        state
    }

    /// CRC32 over every register and memory image in the snapshot.
    pub fn calculate_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let cpu = &self.cpu;
        let scalars = [cpu.pc, cpu.hi, cpu.lo];
        for word in scalars.iter().chain(&cpu.gpr).chain(&cpu.fpr).chain(&cpu.cp0) {
            hasher.update(&word.to_be_bytes());
        }
        hasher.update(&self.instructions.to_be_bytes());
        for mem in [&self.rdram, &self.sp_dmem, &self.sp_imem, &self.pif_ram] {
            hasher.update(mem);
        }
        hasher.finalize()
    }

    /// Checks buffer sizes and the checksum before the state is applied.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("RDRAM", self.rdram.len(), RDRAM_SIZE),
            ("DMEM", self.sp_dmem.len(), SP_MEM_SIZE),
            ("IMEM", self.sp_imem.len(), SP_MEM_SIZE),
            ("PIF RAM", self.pif_ram.len(), PIF_RAM_SIZE),
        ];
        for &(name, len, expected) in &sizes {
            if len != expected {
                return Err(EmuError::SaveState {
                    operation: "validate",
                    reason: format!("{} is {} bytes, expected {}", name, len, expected),
                });
            }
        }
        if self.calculate_checksum() != self.checksum {
            return Err(EmuError::SaveState {
                operation: "validate",
                reason: "checksum mismatch".to_owned(),
            });
        }
        Ok(())
    }
}

/// Quick save/load slots.
#[derive(Debug, Default)]
pub struct SaveSlots {
    slots: [Option<SaveState>; SLOT_COUNT],
}

impl SaveSlots {
    pub fn new() -> SaveSlots {
        SaveSlots::default()
    }

    pub fn save_to_slot(&mut self, slot: usize, state: SaveState) -> Result<()> {
        let entry = self.slots.get_mut(slot).ok_or_else(|| invalid_slot("save", slot))?;
        *entry = Some(state);
        Ok(())
    }

    pub fn load_from_slot(&self, slot: usize) -> Result<&SaveState> {
        self.slots.get(slot)
            .ok_or_else(|| invalid_slot("load", slot))?
            .as_ref()
            .ok_or_else(|| EmuError::SaveState {
                operation: "load",
                reason: format!("slot {} is empty", slot),
            })
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}

fn invalid_slot(operation: &'static str, slot: usize) -> EmuError {
    EmuError::SaveState {
        operation,
        reason: format!("invalid slot number {}", slot),
    }
}
