use crate::bus::mem_map::*;

/// Audio DMA registers.  No samples are produced, so this is plain storage.
#[derive(Default, Debug)]
pub struct Ai {
    reg_dram_addr: u32,
    reg_len:       u32,
    reg_control:   u32,
    reg_status:    u32,
    reg_dacrate:   u32,
    reg_bitrate:   u32,
}

impl Ai {
    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            AI_REG_DRAM_ADDR => self.reg_dram_addr,
            AI_REG_LEN       => self.reg_len,
            AI_REG_CONTROL   => self.reg_control,
            AI_REG_STATUS    => self.reg_status,
            AI_REG_DACRATE   => self.reg_dacrate,
            AI_REG_BITRATE   => self.reg_bitrate,
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32) {
        match addr {
            AI_REG_DRAM_ADDR => self.reg_dram_addr = word,
            AI_REG_LEN       => self.reg_len = word,
            AI_REG_CONTROL   => self.reg_control = word,
            AI_REG_STATUS    => self.reg_status = word,
            AI_REG_DACRATE   => self.reg_dacrate = word,
            AI_REG_BITRATE   => self.reg_bitrate = word,
            _ => {}
        }
    }
}
