use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::bus::mem_map::SP_DMEM_START;
use crate::bus::{Bus, RspView};
use crate::cpu::instr::*;

const MEM_MASK: u32 = 0xffc;
const DMEM_MASK: u32 = 0xfff;

/// The signal processor's scalar unit.  Only a small integer subset runs;
/// the vector unit is not modeled.
#[derive(Default)]
pub struct Rsp {
    gpr:    [u32; 32],
    hi:     u32,
    lo:     u32,
    steps:  u64,
}

impl fmt::Debug for Rsp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..8 {
            for col in 0..4 {
                let i = row + col * 8;
                write!(f, "  {:2}:{} = {:08x}", i, REG_NAMES[i], self.gpr[i])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Rsp {
    /// Runs one instruction from IMEM at the SP PC register.
    pub fn step(&mut self, bus: &mut Bus) {
        let RspView { sp, imem, dmem, icache } = bus.rsp_view();
        let pc = sp.pc() & MEM_MASK;
        let instr = Instr(BigEndian::read_u32(&imem[pc as usize..]));
        sp.set_pc(pc.wrapping_add(4));
        self.steps += 1;
        trace!("RSP {:#05x}: {:?}", pc, instr);

        let dmem_addr = |gpr: &[u32; 32]| {
            (gpr[instr.base()].wrapping_add(instr.imm_se()) & DMEM_MASK) as usize
        };

        match instr.opcode() {
            LUI   => self.write_gpr(instr.rt(), instr.imm() << 16),
            ADDI  => self.arithi(instr, |rs| rs.wrapping_add(instr.imm_se())),
            ADDIU => self.arithi(instr, |rs| rs.wrapping_add(instr.imm_se())),
            ANDI  => self.arithi(instr, |rs| rs & instr.imm()),
            ORI   => self.arithi(instr, |rs| rs | instr.imm()),
            LW    => {
                // words straddling the end of DMEM wrap to its start
                // instead of being skipped
                let addr = dmem_addr(&self.gpr);
                let word = (0..4).fold(0, |acc, i| {
                    acc << 8 | dmem[(addr + i) & DMEM_MASK as usize] as u32
                });
                self.write_gpr(instr.rt(), word);
            }
            LBU   => {
                let addr = dmem_addr(&self.gpr);
                self.write_gpr(instr.rt(), dmem[addr] as u32);
            }
            SW    => {
                let addr = dmem_addr(&self.gpr);
                let word = self.gpr[instr.rt()];
                for i in 0..4 {
                    let offset = (addr + i) & DMEM_MASK as usize;
                    dmem[offset] = (word >> (24 - 8 * i)) as u8;
                    icache.invalidate(SP_DMEM_START + offset as u32);
                }
            }
            SB    => {
                let addr = dmem_addr(&self.gpr);
                dmem[addr] = self.gpr[instr.rt()] as u8;
                icache.invalidate(SP_DMEM_START + addr as u32);
            }
            SPECIAL => match instr.funct() {
                ADD  => self.arithr(instr, |rs, rt| rs.wrapping_add(rt)),
                ADDU => self.arithr(instr, |rs, rt| rs.wrapping_add(rt)),
                SUB  => self.arithr(instr, |rs, rt| rs.wrapping_sub(rt)),
                SUBU => self.arithr(instr, |rs, rt| rs.wrapping_sub(rt)),
                AND  => self.arithr(instr, |rs, rt| rs & rt),
                OR   => self.arithr(instr, |rs, rt| rs | rt),
                XOR  => self.arithr(instr, |rs, rt| rs ^ rt),
                NOR  => self.arithr(instr, |rs, rt| !(rs | rt)),
                SLL  => self.ariths(instr, |rt| rt << instr.sa()),
                SRL  => self.ariths(instr, |rt| rt >> instr.sa()),
                SRA  => self.ariths(instr, |rt| (rt as i32 >> instr.sa()) as u32),
                JR   => sp.set_pc(self.gpr[instr.rs()]),
                MFHI => self.write_gpr(instr.rd(), self.hi),
                MFLO => self.write_gpr(instr.rd(), self.lo),
                MULT => {
                    let result = (self.gpr[instr.rs()] as i32 as i64) *
                        (self.gpr[instr.rt()] as i32 as i64);
                    self.lo = result as u32;
                    self.hi = (result >> 32) as u32;
                }
                _ => {}
            },
            _ => {}
        }

        self.gpr[0] = 0;
    }

    #[inline]
    fn arithi<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32) -> u32
    {
        let res = func(self.gpr[instr.rs()]);
        self.write_gpr(instr.rt(), res);
    }

    #[inline]
    fn arithr<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32, u32) -> u32
    {
        let res = func(self.gpr[instr.rs()], self.gpr[instr.rt()]);
        self.write_gpr(instr.rd(), res);
    }

    #[inline]
    fn ariths<F>(&mut self, instr: Instr, func: F)
        where F: Fn(u32) -> u32
    {
        let res = func(self.gpr[instr.rt()]);
        self.write_gpr(instr.rd(), res);
    }

    fn write_gpr(&mut self, index: usize, value: u32) {
        if index != 0 {
            self.gpr[index] = value;
        }
    }

    pub fn gpr(&self, index: usize) -> u32 {
        self.gpr[index]
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
