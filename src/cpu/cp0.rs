// Register numbers.
pub const REG_COUNT:  usize = 9;
pub const REG_STATUS: usize = 12;
pub const REG_CAUSE:  usize = 13;
pub const REG_EPC:    usize = 14;
pub const REG_PRID:   usize = 15;

// Status bits.
pub const STATUS_EXL: u32 = 1 << 1;

pub const PRID_VR4300: u32 = 0x0000_0b00;

/// System control coprocessor.  Registers are plain storage; nothing
/// here raises exceptions.
#[derive(Debug, Default)]
pub struct Cp0 {
    regs: [u32; 32],
}

impl Cp0 {
    pub fn power_on_reset(&mut self, pc: u32) {
        self.regs[REG_STATUS] = 0x7040_0004;
        self.regs[REG_CAUSE] = 0;
        self.regs[REG_EPC] = pc;
        self.regs[REG_PRID] = PRID_VR4300;
    }

    pub fn read_reg(&self, index: usize) -> u32 {
        self.regs[index & 0b11111]
    }

    pub fn write_reg(&mut self, index: usize, value: u32) {
        self.regs[index & 0b11111] = value;
    }

    pub fn regs(&self) -> &[u32; 32] {
        &self.regs
    }

    pub fn set_regs(&mut self, regs: &[u32; 32]) {
        self.regs = *regs;
    }

    /// Returns the exception return address and leaves exception level.
    pub fn eret(&mut self) -> u32 {
        self.regs[REG_STATUS] &= !STATUS_EXL;
        self.regs[REG_EPC]
    }

    /// Advances the Count register; called once per executed instruction.
    pub fn tick(&mut self) {
        self.regs[REG_COUNT] = self.regs[REG_COUNT].wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_values() {
        let mut cp0 = Cp0::default();
        cp0.power_on_reset(0x8024_6000);
        assert_eq!(cp0.read_reg(REG_STATUS), 0x7040_0004);
        assert_eq!(cp0.read_reg(REG_EPC), 0x8024_6000);
        assert_eq!(cp0.read_reg(REG_PRID), 0xb00);
    }

    #[test]
    fn eret_clears_exl() {
        let mut cp0 = Cp0::default();
        cp0.write_reg(REG_STATUS, 0x7040_0006);
        cp0.write_reg(REG_EPC, 0x8000_0180);
        assert_eq!(cp0.eret(), 0x8000_0180);
        assert_eq!(cp0.read_reg(REG_STATUS), 0x7040_0004);
    }
}
