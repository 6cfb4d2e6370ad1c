use crate::bus::mem_map::*;
use crate::bus::mi::{Intr, Mi};

// DMA busy, IO busy and DMA error flags.
const STATUS_BUSY_MASK: u32 = 0b1011;

/// Serial interface registers.  Controller traffic is not modeled.
#[derive(Default, Debug)]
pub struct Si {
    reg_dram_addr: u32,
    reg_pif_rd64b: u32,
    reg_pif_wr64b: u32,
    reg_status:    u32,
}

impl Si {
    pub fn read_reg(&self, addr: u32) -> u32 {
        match addr {
            SI_REG_DRAM_ADDR      => self.reg_dram_addr,
            SI_REG_PIF_ADDR_RD64B => self.reg_pif_rd64b,
            SI_REG_PIF_ADDR_WR64B => self.reg_pif_wr64b,
            SI_REG_STATUS         => self.reg_status & !STATUS_BUSY_MASK,
            _ => 0,
        }
    }

    pub fn write_reg(&mut self, addr: u32, word: u32, mi: &mut Mi) {
        match addr {
            SI_REG_DRAM_ADDR      => self.reg_dram_addr = word & 0xff_ffff,
            SI_REG_PIF_ADDR_RD64B => self.reg_pif_rd64b = word,
            SI_REG_PIF_ADDR_WR64B => self.reg_pif_wr64b = word,
            // any write acknowledges the interrupt
            SI_REG_STATUS         => {
                self.reg_status = 0;
                mi.clear_interrupt(Intr::SI);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_busy() {
        let si = Si { reg_status: 0xffff, ..Si::default() };
        assert_eq!(si.read_reg(SI_REG_STATUS) & STATUS_BUSY_MASK, 0);
    }

    #[test]
    fn status_write_acks_interrupt() {
        let mut si = Si::default();
        let mut mi = Mi::default();
        mi.set_interrupt(Intr::SI);
        si.write_reg(SI_REG_STATUS, 0, &mut mi);
        assert!(mi.pending().is_empty());
    }
}
