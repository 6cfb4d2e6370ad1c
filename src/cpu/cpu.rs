use std::fmt;

use tracing::trace;

use super::cp0::Cp0;
use crate::save_state::CpuState;
use super::instr::*;
use crate::bus::mem::{MemFmt, Memory};

const NUM_GPR: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuStats {
    pub instructions:    u64,
    pub unknown_opcodes: u64,
}

#[derive(Default)]
pub struct Cpu {
    reg_gpr: [u32; NUM_GPR],
    // FPU registers as raw words; only moved to and from GPRs.
    reg_fpr: [u32; NUM_GPR],

    reg_hi: u32,
    reg_lo: u32,

    cp0: Cp0,

    stats: CpuStats,
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..8 {
            for col in 0..4 {
                let i = row + col * 8;
                write!(f, "  {:2}:{} = {:08x}", i, REG_NAMES[i], self.reg_gpr[i])?;
            }
            writeln!(f)?;
        }
        write!(f, "  hi = {:08x}  lo = {:08x}", self.reg_hi, self.reg_lo)
    }
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu::default()
    }

    /// Register state the boot code would have left behind.
    pub fn power_on_reset(&mut self, pc: u32) {
        self.reg_gpr[20] = 1;
        self.reg_gpr[22] = 0x3f;
        self.reg_gpr[29] = 0xa400_1ff0;
        self.cp0.power_on_reset(pc);
    }

    /// Executes `instr`, located at `pc`, and returns the address of the
    /// next instruction.  Branches and jumps take effect immediately.
    pub fn execute<M: Memory>(&mut self, instr: Instr, pc: u32, mem: &mut M) -> u32 {
        let mut next_pc = pc.wrapping_add(4);
        self.stats.instructions += 1;
        self.cp0.tick();

        match instr.opcode() {
            LUI   => self.write_gpr(instr.rt(), instr.imm() << 16),
            LW    => self.load::<u32, _>(instr, mem, |w| w),
            LH    => self.load::<u16, _>(instr, mem, |h| h as i16 as u32),
            LHU   => self.load::<u16, _>(instr, mem, |h| h as u32),
            LB    => self.load::<u8, _>(instr, mem, |b| b as i8 as u32),
            LBU   => self.load::<u8, _>(instr, mem, |b| b as u32),
            SW    => self.store(instr, mem, |rt| rt),
            SH    => self.store(instr, mem, |rt| rt as u16),
            SB    => self.store(instr, mem, |rt| rt as u8),
            // no overflow traps
            ADDI  => self.arithi(instr, |rs| rs.wrapping_add(instr.imm_se())),
            ADDIU => self.arithi(instr, |rs| rs.wrapping_add(instr.imm_se())),
            ANDI  => self.arithi(instr, |rs| rs & instr.imm()),
            ORI   => self.arithi(instr, |rs| rs | instr.imm()),
            XORI  => self.arithi(instr, |rs| rs ^ instr.imm()),
            SLTI  => self.arithi(instr, |rs| ((rs as i32) < instr.imm_signed()) as u32),
            SLTIU => self.arithi(instr, |rs| (rs < instr.imm_se()) as u32),
            J     => next_pc = instr.jump_target(pc),
            JAL   => {
                self.write_gpr(31, pc.wrapping_add(4));
                next_pc = instr.jump_target(pc);
            }
            BEQ   => if self.read_gpr(instr.rs()) == self.read_gpr(instr.rt()) {
                next_pc = instr.branch_target(pc);
            },
            BNE   => if self.read_gpr(instr.rs()) != self.read_gpr(instr.rt()) {
                next_pc = instr.branch_target(pc);
            },
            BLEZ  => if self.read_gpr(instr.rs()) as i32 <= 0 {
                next_pc = instr.branch_target(pc);
            },
            BGTZ  => if self.read_gpr(instr.rs()) as i32 > 0 {
                next_pc = instr.branch_target(pc);
            },
            CACHE => {}
            SPECIAL => match instr.funct() {
                JR   => next_pc = self.read_gpr(instr.rs()),
                JALR => {
                    // read the target first, rd may equal rs
                    let target = self.read_gpr(instr.rs());
                    self.write_gpr(instr.rd(), pc.wrapping_add(4));
                    next_pc = target;
                }
                ADD  => self.arithr(instr, |rs, rt| rs.wrapping_add(rt)),
                ADDU => self.arithr(instr, |rs, rt| rs.wrapping_add(rt)),
                SUB  => self.arithr(instr, |rs, rt| rs.wrapping_sub(rt)),
                SUBU => self.arithr(instr, |rs, rt| rs.wrapping_sub(rt)),
                AND  => self.arithr(instr, |rs, rt| rs & rt),
                OR   => self.arithr(instr, |rs, rt| rs | rt),
                XOR  => self.arithr(instr, |rs, rt| rs ^ rt),
                NOR  => self.arithr(instr, |rs, rt| !(rs | rt)),
                SLT  => self.arithr(instr, |rs, rt| ((rs as i32) < rt as i32) as u32),
                SLTU => self.arithr(instr, |rs, rt| (rs < rt) as u32),
                SLLV => self.arithr(instr, |rs, rt| rt << (rs & 0b11111)),
                SRLV => self.arithr(instr, |rs, rt| rt >> (rs & 0b11111)),
                SRAV => self.arithr(instr, |rs, rt| (rt as i32 >> (rs & 0b11111)) as u32),
                SLL  => self.ariths(instr, |rt| rt << instr.sa()),
                SRL  => self.ariths(instr, |rt| rt >> instr.sa()),
                SRA  => self.ariths(instr, |rt| (rt as i32 >> instr.sa()) as u32),
                MFHI => { let val = self.reg_hi; self.write_gpr(instr.rd(), val); }
                MFLO => { let val = self.reg_lo; self.write_gpr(instr.rd(), val); }
                MTHI => self.reg_hi = self.read_gpr(instr.rs()),
                MTLO => self.reg_lo = self.read_gpr(instr.rs()),
                MULT => {
                    let result = (self.read_gpr(instr.rs()) as i32 as i64) *
                        (self.read_gpr(instr.rt()) as i32 as i64);
                    self.reg_lo = result as u32;
                    self.reg_hi = (result >> 32) as u32;
                }
                MULTU => {
                    let result = (self.read_gpr(instr.rs()) as u64) *
                        (self.read_gpr(instr.rt()) as u64);
                    self.reg_lo = result as u32;
                    self.reg_hi = (result >> 32) as u32;
                }
                DIV  => {
                    let rs = self.read_gpr(instr.rs()) as i32;
                    let rt = self.read_gpr(instr.rt()) as i32;
                    if rt == 0 {
                        self.reg_lo = if rs < 0 { 1 } else { u32::MAX };
                        self.reg_hi = rs as u32;
                    } else {
                        // i32::MIN / -1 wraps to i32::MIN like the hardware
                        self.reg_lo = rs.wrapping_div(rt) as u32;
                        self.reg_hi = rs.wrapping_rem(rt) as u32;
                    }
                }
                DIVU => {
                    let rs = self.read_gpr(instr.rs());
                    let rt = self.read_gpr(instr.rt());
                    if rt == 0 {
                        self.reg_lo = u32::MAX;
                        self.reg_hi = rs;
                    } else {
                        self.reg_lo = rs / rt;
                        self.reg_hi = rs % rt;
                    }
                }
                SYNC => {}
                _ => self.unknown(instr, pc),
            },
            REGIMM => match instr.regimm_op() {
                BLTZ => if (self.read_gpr(instr.rs()) as i32) < 0 {
                    next_pc = instr.branch_target(pc);
                },
                BGEZ => if self.read_gpr(instr.rs()) as i32 >= 0 {
                    next_pc = instr.branch_target(pc);
                },
                _ => self.unknown(instr, pc),
            },
            COP0 => match instr.cop_op() {
                MF => {
                    let data = self.cp0.read_reg(instr.rd());
                    self.write_gpr(instr.rt(), data);
                }
                MT => {
                    let data = self.read_gpr(instr.rt());
                    self.cp0.write_reg(instr.rd(), data);
                }
                CO if instr.funct() == ERET => next_pc = self.cp0.eret(),
                _ => self.unknown(instr, pc),
            },
            COP1 => match instr.cop_op() {
                MF => {
                    let data = self.reg_fpr[instr.rd()];
                    self.write_gpr(instr.rt(), data);
                }
                MT => self.reg_fpr[instr.rd()] = self.read_gpr(instr.rt()),
                _ => self.unknown(instr, pc),
            },
            _ => self.unknown(instr, pc),
        }

        self.reg_gpr[0] = 0;
        next_pc
    }

    #[inline]
    fn arithi<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32) -> u32
    {
        let res = func(self.read_gpr(instr.rs()));
        self.write_gpr(instr.rt(), res);
    }

    #[inline]
    fn arithr<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32, u32) -> u32
    {
        let res = func(self.read_gpr(instr.rs()), self.read_gpr(instr.rt()));
        self.write_gpr(instr.rd(), res);
    }

    #[inline]
    fn ariths<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32) -> u32
    {
        let res = func(self.read_gpr(instr.rt()));
        self.write_gpr(instr.rd(), res);
    }

    #[inline]
    fn load<T, M>(&mut self, instr: Instr, mem: &mut M, extend: fn(T) -> u32)
        where T: MemFmt, M: Memory
    {
        let addr = self.read_gpr(instr.base()).wrapping_add(instr.imm_se());
        let value = mem.load::<T>(addr);
        self.write_gpr(instr.rt(), extend(value));
    }

    #[inline]
    fn store<T, M>(&mut self, instr: Instr, mem: &mut M, narrow: fn(u32) -> T)
        where T: MemFmt, M: Memory
    {
        let addr = self.read_gpr(instr.base()).wrapping_add(instr.imm_se());
        mem.store(addr, narrow(self.read_gpr(instr.rt())));
    }

    fn unknown(&mut self, instr: Instr, pc: u32) {
        self.stats.unknown_opcodes += 1;
        trace!("unknown instruction at {:#010x}: {:#010x} ({:?})", pc, instr.0, instr);
    }

    #[inline]
    fn write_gpr(&mut self, index: usize, value: u32) {
        if index != 0 {
            self.reg_gpr[index] = value;
        }
    }

    #[inline]
    pub fn read_gpr(&self, index: usize) -> u32 {
        self.reg_gpr[index]
    }

    /// Register poke for tests and debugging; r0 stays zero.
    pub fn set_gpr(&mut self, index: usize, value: u32) {
        self.write_gpr(index, value);
    }

    pub fn hi(&self) -> u32 {
        self.reg_hi
    }

    pub fn lo(&self) -> u32 {
        self.reg_lo
    }

    pub fn cp0(&self) -> &Cp0 {
        &self.cp0
    }

    pub fn cp0_mut(&mut self) -> &mut Cp0 {
        &mut self.cp0
    }

    pub fn stats(&self) -> CpuStats {
        self.stats
    }

    pub fn save(&self, pc: u32) -> CpuState {
        CpuState {
            pc,
            gpr: self.reg_gpr,
            fpr: self.reg_fpr,
            hi:  self.reg_hi,
            lo:  self.reg_lo,
            cp0: *self.cp0.regs(),
        }
    }

    /// Takes over the registers of `state` and its instruction count.
    pub fn restore(&mut self, state: &CpuState, instructions: u64) {
        self.reg_gpr = state.gpr;
        self.reg_gpr[0] = 0;
        self.reg_fpr = state.fpr;
        self.reg_hi = state.hi;
        self.reg_lo = state.lo;
        self.cp0.set_regs(&state.cp0);
        self.stats.instructions = instructions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::cpu::cp0::{REG_EPC, REG_STATUS};

    // Assembler helpers for the few encodings the tests need.
    fn r_type(funct: u32, rs: u32, rt: u32, rd: u32, sa: u32) -> Instr {
        Instr(rs << 21 | rt << 16 | rd << 11 | sa << 6 | funct)
    }

    fn i_type(op: u32, rs: u32, rt: u32, imm: u16) -> Instr {
        Instr(op << 26 | rs << 21 | rt << 16 | imm as u32)
    }

    fn run(cpu: &mut Cpu, bus: &mut Bus, instr: Instr) -> u32 {
        cpu.execute(instr, 0x8000_1000, bus)
    }

    #[test]
    fn r0_stays_zero() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0x1234);
        run(&mut cpu, &mut bus, i_type(ADDIU, 8, 0, 1));
        run(&mut cpu, &mut bus, r_type(OR, 8, 8, 0, 0));
        run(&mut cpu, &mut bus, i_type(LUI, 0, 0, 0xffff));
        assert_eq!(cpu.read_gpr(0), 0);
    }

    #[test]
    fn add_sub_wrap() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0xffff_ffff);
        cpu.set_gpr(9, 1);
        run(&mut cpu, &mut bus, r_type(ADD, 8, 9, 10, 0));
        assert_eq!(cpu.read_gpr(10), 0);
        run(&mut cpu, &mut bus, r_type(SUB, 0, 9, 10, 0));
        assert_eq!(cpu.read_gpr(10), 0xffff_ffff);
        cpu.set_gpr(8, 0x7fff_ffff);
        run(&mut cpu, &mut bus, i_type(ADDI, 8, 11, 1));
        assert_eq!(cpu.read_gpr(11), 0x8000_0000);
    }

    #[test]
    fn immediates_extend_correctly() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        run(&mut cpu, &mut bus, i_type(ADDIU, 0, 8, 0xffff));
        assert_eq!(cpu.read_gpr(8), 0xffff_ffff);
        run(&mut cpu, &mut bus, i_type(ORI, 0, 9, 0xffff));
        assert_eq!(cpu.read_gpr(9), 0x0000_ffff);
        run(&mut cpu, &mut bus, i_type(LUI, 0, 10, 0xa430));
        assert_eq!(cpu.read_gpr(10), 0xa430_0000);
        run(&mut cpu, &mut bus, i_type(SLTI, 8, 11, 0));
        assert_eq!(cpu.read_gpr(11), 1);
        run(&mut cpu, &mut bus, i_type(SLTIU, 8, 11, 0));
        assert_eq!(cpu.read_gpr(11), 0);
    }

    #[test]
    fn shifts() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0x8000_00f0);
        run(&mut cpu, &mut bus, r_type(SRA, 0, 8, 9, 4));
        assert_eq!(cpu.read_gpr(9), 0xf800_000f);
        run(&mut cpu, &mut bus, r_type(SRL, 0, 8, 9, 4));
        assert_eq!(cpu.read_gpr(9), 0x0800_000f);
        run(&mut cpu, &mut bus, r_type(SLL, 0, 8, 9, 4));
        assert_eq!(cpu.read_gpr(9), 0x0000_0f00);
        cpu.set_gpr(10, 36);  // only the low five bits count
        run(&mut cpu, &mut bus, r_type(SRLV, 10, 8, 9, 0));
        assert_eq!(cpu.read_gpr(9), 0x0800_000f);
    }

    #[test]
    fn multiply_and_divide() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, (-3i32) as u32);
        cpu.set_gpr(9, 7);
        run(&mut cpu, &mut bus, r_type(MULT, 8, 9, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), (0xffff_ffff, (-21i32) as u32));
        run(&mut cpu, &mut bus, r_type(MULTU, 8, 9, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), (6, 0xffff_ffeb));
        run(&mut cpu, &mut bus, r_type(DIV, 8, 9, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), ((-3i32) as u32, 0));
        run(&mut cpu, &mut bus, r_type(DIV, 9, 0, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), (7, 0xffff_ffff));
        run(&mut cpu, &mut bus, r_type(DIV, 8, 0, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), ((-3i32) as u32, 1));
        run(&mut cpu, &mut bus, r_type(DIVU, 9, 0, 0, 0));
        assert_eq!((cpu.hi(), cpu.lo()), (7, 0xffff_ffff));
        run(&mut cpu, &mut bus, r_type(MFHI, 0, 0, 10, 0));
        run(&mut cpu, &mut bus, r_type(MFLO, 0, 0, 11, 0));
        assert_eq!((cpu.read_gpr(10), cpu.read_gpr(11)), (7, 0xffff_ffff));
    }

    #[test]
    fn branches_have_no_delay_slot() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        assert_eq!(run(&mut cpu, &mut bus, i_type(BEQ, 0, 0, 4)), 0x8000_1014);
        assert_eq!(run(&mut cpu, &mut bus, i_type(BEQ, 0, 0, 0xfffe)), 0x8000_0ffc);
        assert_eq!(run(&mut cpu, &mut bus, i_type(BNE, 0, 0, 4)), 0x8000_1004);
        cpu.set_gpr(8, 0x8000_0000);
        assert_eq!(run(&mut cpu, &mut bus, i_type(BLEZ, 8, 0, 4)), 0x8000_1014);
        assert_eq!(run(&mut cpu, &mut bus, i_type(BGTZ, 8, 0, 4)), 0x8000_1004);
        assert_eq!(run(&mut cpu, &mut bus, i_type(REGIMM, 8, BLTZ, 4)), 0x8000_1014);
        assert_eq!(run(&mut cpu, &mut bus, i_type(REGIMM, 8, BGEZ, 4)), 0x8000_1004);
    }

    #[test]
    fn jumps_and_links() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        let next = cpu.execute(Instr(JAL << 26 | 0x0091800), 0x8000_0400, &mut bus);
        assert_eq!(next, 0x8024_6000);
        assert_eq!(cpu.read_gpr(31), 0x8000_0404);
        cpu.set_gpr(8, 0x8000_2000);
        assert_eq!(run(&mut cpu, &mut bus, r_type(JALR, 8, 0, 8, 0)), 0x8000_2000);
        assert_eq!(cpu.read_gpr(8), 0x8000_1004);
        assert_eq!(run(&mut cpu, &mut bus, r_type(JR, 31, 0, 0, 0)), 0x8000_0404);
    }

    #[test]
    fn loads_extend_and_stores_narrow() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0x8000_0100);
        cpu.set_gpr(9, 0x1234_8678);
        run(&mut cpu, &mut bus, i_type(SW, 8, 9, 0));
        run(&mut cpu, &mut bus, i_type(LH, 8, 10, 2));
        assert_eq!(cpu.read_gpr(10), 0xffff_8678);
        run(&mut cpu, &mut bus, i_type(LHU, 8, 10, 2));
        assert_eq!(cpu.read_gpr(10), 0x0000_8678);
        run(&mut cpu, &mut bus, i_type(LB, 8, 10, 2));
        assert_eq!(cpu.read_gpr(10), 0xffff_ff86);
        run(&mut cpu, &mut bus, i_type(LBU, 8, 10, 2));
        assert_eq!(cpu.read_gpr(10), 0x86);
        run(&mut cpu, &mut bus, i_type(SB, 8, 9, 0));
        run(&mut cpu, &mut bus, i_type(SH, 8, 9, 2));
        run(&mut cpu, &mut bus, i_type(LW, 8, 10, 0));
        assert_eq!(cpu.read_gpr(10), 0x7834_8678);
        // negative offsets through the uncached alias
        cpu.set_gpr(8, 0xa000_0104);
        run(&mut cpu, &mut bus, i_type(LW, 8, 10, 0xfffc));
        assert_eq!(cpu.read_gpr(10), 0x7834_8678);
    }

    #[test]
    fn cop0_moves_and_eret() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0x8000_0180);
        run(&mut cpu, &mut bus, Instr(COP0 << 26 | MT << 21 | 8 << 16 | (REG_EPC as u32) << 11));
        cpu.cp0_mut().write_reg(REG_STATUS, 0x2);
        run(&mut cpu, &mut bus, Instr(COP0 << 26 | MF << 21 | 9 << 16 | (REG_EPC as u32) << 11));
        assert_eq!(cpu.read_gpr(9), 0x8000_0180);
        assert_eq!(run(&mut cpu, &mut bus, Instr(0x4200_0018)), 0x8000_0180);
        assert_eq!(cpu.cp0().read_reg(REG_STATUS), 0);
    }

    #[test]
    fn cop1_raw_transfer() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        cpu.set_gpr(8, 0x3f80_0000);
        run(&mut cpu, &mut bus, Instr(COP1 << 26 | MT << 21 | 8 << 16 | 2 << 11));
        run(&mut cpu, &mut bus, Instr(COP1 << 26 | MF << 21 | 9 << 16 | 2 << 11));
        assert_eq!(cpu.read_gpr(9), 0x3f80_0000);
    }

    #[test]
    fn unknown_is_a_counted_nop() {
        let mut cpu = Cpu::new();
        let mut bus = Bus::default();
        assert_eq!(run(&mut cpu, &mut bus, Instr(0xfc00_0000)), 0x8000_1004);
        assert_eq!(run(&mut cpu, &mut bus, Instr(0x0000_003f)), 0x8000_1004);
        assert_eq!(run(&mut cpu, &mut bus, Instr(0x4220_0000)), 0x8000_1004);
        assert_eq!(cpu.stats().unknown_opcodes, 3);
        assert_eq!(cpu.stats().instructions, 3);
    }
}
