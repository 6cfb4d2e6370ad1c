use std::fmt;

pub const REG_NAMES: [&str; 32] = [
    "zz", "at", "v0", "v1", "a0", "a1", "a2", "a3",
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7",
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra"];

// Primary opcodes (bits 31..26).
pub const SPECIAL: u32 = 0x00;
pub const REGIMM:  u32 = 0x01;
pub const J:       u32 = 0x02;
pub const JAL:     u32 = 0x03;
pub const BEQ:     u32 = 0x04;
pub const BNE:     u32 = 0x05;
pub const BLEZ:    u32 = 0x06;
pub const BGTZ:    u32 = 0x07;
pub const ADDI:    u32 = 0x08;
pub const ADDIU:   u32 = 0x09;
pub const SLTI:    u32 = 0x0a;
pub const SLTIU:   u32 = 0x0b;
pub const ANDI:    u32 = 0x0c;
pub const ORI:     u32 = 0x0d;
pub const XORI:    u32 = 0x0e;
pub const LUI:     u32 = 0x0f;
pub const COP0:    u32 = 0x10;
pub const COP1:    u32 = 0x11;
pub const LB:      u32 = 0x20;
pub const LH:      u32 = 0x21;
pub const LW:      u32 = 0x23;
pub const LBU:     u32 = 0x24;
pub const LHU:     u32 = 0x25;
pub const SB:      u32 = 0x28;
pub const SH:      u32 = 0x29;
pub const SW:      u32 = 0x2b;
pub const CACHE:   u32 = 0x2f;

// SPECIAL functions (bits 5..0).
pub const SLL:     u32 = 0x00;
pub const SRL:     u32 = 0x02;
pub const SRA:     u32 = 0x03;
pub const SLLV:    u32 = 0x04;
pub const SRLV:    u32 = 0x06;
pub const SRAV:    u32 = 0x07;
pub const JR:      u32 = 0x08;
pub const JALR:    u32 = 0x09;
pub const SYNC:    u32 = 0x0f;
pub const MFHI:    u32 = 0x10;
pub const MTHI:    u32 = 0x11;
pub const MFLO:    u32 = 0x12;
pub const MTLO:    u32 = 0x13;
pub const MULT:    u32 = 0x18;
pub const MULTU:   u32 = 0x19;
pub const DIV:     u32 = 0x1a;
pub const DIVU:    u32 = 0x1b;
pub const ADD:     u32 = 0x20;
pub const ADDU:    u32 = 0x21;
pub const SUB:     u32 = 0x22;
pub const SUBU:    u32 = 0x23;
pub const AND:     u32 = 0x24;
pub const OR:      u32 = 0x25;
pub const XOR:     u32 = 0x26;
pub const NOR:     u32 = 0x27;
pub const SLT:     u32 = 0x2a;
pub const SLTU:    u32 = 0x2b;

// REGIMM selectors (bits 20..16).
pub const BLTZ:    u32 = 0x00;
pub const BGEZ:    u32 = 0x01;

// Coprocessor operations (bits 25..21), and ERET's function.
pub const MF:      u32 = 0x00;
pub const MT:      u32 = 0x04;
pub const CO:      u32 = 0x10;
pub const ERET:    u32 = 0x18;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Instr(pub u32);

impl Instr {
    #[inline(always)]
    pub fn opcode(self) -> u32 {
        self.0 >> 26
    }

    #[inline(always)]
    pub fn rs(self) -> usize {
        (self.0 as usize >> 21) & 0b11111
    }

    #[inline(always)]
    pub fn rt(self) -> usize {
        (self.0 as usize >> 16) & 0b11111
    }

    #[inline(always)]
    pub fn rd(self) -> usize {
        (self.0 as usize >> 11) & 0b11111
    }

    #[inline(always)]
    pub fn base(self) -> usize {
        self.rs()
    }

    #[inline(always)]
    pub fn cop_op(self) -> u32 {
        (self.0 >> 21) & 0b11111
    }

    #[inline(always)]
    pub fn funct(self) -> u32 {
        self.0 & 0b111111
    }

    #[inline(always)]
    pub fn regimm_op(self) -> u32 {
        (self.0 >> 16) & 0b11111
    }

    #[inline(always)]
    pub fn sa(self) -> u32 {
        (self.0 >> 6) & 0b11111
    }

    #[inline(always)]
    pub fn imm(self) -> u32 {
        self.0 & 0xffff
    }

    #[inline(always)]
    pub fn imm_se(self) -> u32 {
        (self.0 & 0xffff) as i16 as u32
    }

    #[inline(always)]
    pub fn imm_signed(self) -> i32 {
        (self.0 & 0xffff) as i16 as i32
    }

    #[inline(always)]
    pub fn j_target(self) -> u32 {
        self.0 & 0x3ff_ffff
    }

    /// Target of a taken branch at `pc`.
    #[inline(always)]
    pub fn branch_target(self, pc: u32) -> u32 {
        pc.wrapping_add(4).wrapping_add(self.imm_se() << 2)
    }

    /// Target of J/JAL at `pc`: the region bits of `pc` with the 26-bit
    /// target shifted in.
    #[inline(always)]
    pub fn jump_target(self, pc: u32) -> u32 {
        (pc & 0xf000_0000) | (self.j_target() << 2)
    }
}

/// How the operands of a mnemonic are laid out in the disassembly.
#[derive(Clone, Copy)]
enum Operands {
    Bare,
    Rs,
    Rd,
    RsRt,
    RdRs,
    RdRsRt,
    RdRtRs,
    RdRtSa,
    RtUimm,
    RtRsSimm,
    RtRsUimm,
    RtMem,
    RsOff,
    RsRtOff,
    Off,
    Target,
    Cop(u32),
}

impl Instr {
    fn mnemonic(self) -> Option<(&'static str, Operands)> {
        use self::Operands::*;
        Some(match self.opcode() {
            SPECIAL => match self.funct() {
                SLL if self.0 == 0 => ("nop", Bare),
                SLL   => ("sll", RdRtSa),
                SRL   => ("srl", RdRtSa),
                SRA   => ("sra", RdRtSa),
                SLLV  => ("sllv", RdRtRs),
                SRLV  => ("srlv", RdRtRs),
                SRAV  => ("srav", RdRtRs),
                JR    => ("jr", Rs),
                JALR  => ("jalr", RdRs),
                SYNC  => ("sync", Bare),
                MFHI  => ("mfhi", Rd),
                MTHI  => ("mthi", Rs),
                MFLO  => ("mflo", Rd),
                MTLO  => ("mtlo", Rs),
                MULT  => ("mult", RsRt),
                MULTU => ("multu", RsRt),
                DIV   => ("div", RsRt),
                DIVU  => ("divu", RsRt),
                ADD   => ("add", RdRsRt),
                ADDU  => ("addu", RdRsRt),
                SUB   => ("sub", RdRsRt),
                SUBU  => ("subu", RdRsRt),
                AND   => ("and", RdRsRt),
                OR if self.rt() == 0 => ("move", RdRs),
                OR    => ("or", RdRsRt),
                XOR   => ("xor", RdRsRt),
                NOR   => ("nor", RdRsRt),
                SLT   => ("slt", RdRsRt),
                SLTU  => ("sltu", RdRsRt),
                _     => return None,
            },
            REGIMM => match self.regimm_op() {
                BGEZ if self.rs() == 0 => ("b", Off),
                BGEZ  => ("bgez", RsOff),
                BLTZ  => ("bltz", RsOff),
                _     => return None,
            },
            J     => ("j", Target),
            JAL   => ("jal", Target),
            BEQ if self.rt() == 0 => ("beqz", RsOff),
            BEQ   => ("beq", RsRtOff),
            BNE if self.rt() == 0 => ("bnez", RsOff),
            BNE   => ("bne", RsRtOff),
            BLEZ  => ("blez", RsOff),
            BGTZ  => ("bgtz", RsOff),
            ADDIU if self.rs() == 0 => ("li", RtUimm),
            ADDI  => ("addi", RtRsSimm),
            ADDIU => ("addiu", RtRsSimm),
            SLTI  => ("slti", RtRsSimm),
            SLTIU => ("sltiu", RtRsSimm),
            ANDI  => ("andi", RtRsUimm),
            ORI   => ("ori", RtRsUimm),
            XORI  => ("xori", RtRsUimm),
            LUI   => ("lui", RtUimm),
            COP0 | COP1 => {
                let unit = self.opcode() - COP0;
                match (self.cop_op(), unit) {
                    (MF, 0) => ("mfc0", Cop(0)),
                    (MT, 0) => ("mtc0", Cop(0)),
                    (MF, 1) => ("mfc1", Cop(1)),
                    (MT, 1) => ("mtc1", Cop(1)),
                    (CO, 0) if self.funct() == ERET => ("eret", Bare),
                    _ => return None,
                }
            }
            LB    => ("lb", RtMem),
            LH    => ("lh", RtMem),
            LW    => ("lw", RtMem),
            LBU   => ("lbu", RtMem),
            LHU   => ("lhu", RtMem),
            SB    => ("sb", RtMem),
            SH    => ("sh", RtMem),
            SW    => ("sw", RtMem),
            CACHE => ("cache", Bare),
            _     => return None,
        })
    }
}

impl fmt::Debug for Instr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Operands::*;
        let (name, operands) = match self.mnemonic() {
            Some(found) => found,
            None => return write!(f, "unk   {:#010x}", self.0),
        };
        let (rs, rt, rd) = (REG_NAMES[self.rs()], REG_NAMES[self.rt()], REG_NAMES[self.rd()]);
        // branch offsets are shown relative to the branch itself
        let off = (self.imm_signed() + 1) << 2;
        match operands {
            Bare       => write!(f, "{}", name),
            Rs         => write!(f, "{:5} {}", name, rs),
            Rd         => write!(f, "{:5} {}", name, rd),
            RsRt       => write!(f, "{:5} {}, {}", name, rs, rt),
            RdRs       => write!(f, "{:5} {}, {}", name, rd, rs),
            RdRsRt     => write!(f, "{:5} {}, {}, {}", name, rd, rs, rt),
            RdRtRs     => write!(f, "{:5} {}, {}, {}", name, rd, rt, rs),
            RdRtSa     => write!(f, "{:5} {}, {}, {}", name, rd, rt, self.sa()),
            RtUimm     => write!(f, "{:5} {}, {:#x}", name, rt, self.imm()),
            RtRsSimm   => write!(f, "{:5} {}, {}, {}", name, rt, rs, self.imm_signed()),
            RtRsUimm   => write!(f, "{:5} {}, {}, {:#x}", name, rt, rs, self.imm()),
            RtMem      => write!(f, "{:5} {}, {}({})", name, rt, self.imm_signed(), rs),
            RsOff      => write!(f, "{:5} {}, {:+}", name, rs, off),
            RsRtOff    => write!(f, "{:5} {}, {}, {:+}", name, rs, rt, off),
            Off        => write!(f, "{:5} {:+}", name, off),
            Target     => write!(f, "{:5} {:#x}", name, self.j_target() << 2),
            Cop(0)     => write!(f, "{:5} {}, ${}", name, rt, self.rd()),
            Cop(_)     => write!(f, "{:5} {}, $f{}", name, rt, self.rd()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields() {
        // addiu t0, a0, -4
        let instr = Instr(0x2488_fffc);
        assert_eq!(instr.opcode(), ADDIU);
        assert_eq!(instr.rs(), 4);
        assert_eq!(instr.rt(), 8);
        assert_eq!(instr.imm(), 0xfffc);
        assert_eq!(instr.imm_se(), 0xffff_fffc);
        assert_eq!(instr.imm_signed(), -4);
    }

    #[test]
    fn targets() {
        // beq zero, zero, -1 at 0x80001000 loops on itself
        assert_eq!(Instr(0x1000_ffff).branch_target(0x8000_1000), 0x8000_1000);
        assert_eq!(Instr(0x1000_0003).branch_target(0x8000_1000), 0x8000_1010);
        // j 0x0246000 keeps the region bits
        assert_eq!(Instr(0x0809_1800).jump_target(0x8000_0000), 0x8024_6000);
    }

    #[test]
    fn disassembly() {
        assert_eq!(format!("{:?}", Instr(0)), "nop");
        assert_eq!(format!("{:?}", Instr(0x3c08_a430)), "lui   t0, 0xa430");
        assert_eq!(format!("{:?}", Instr(0x8d09_0004)), "lw    t1, 4(t0)");
        assert_eq!(format!("{:?}", Instr(0x4200_0018)), "eret");
        assert_eq!(format!("{:?}", Instr(0x4089_6000)), "mtc0  t1, $12");
    }

    #[test]
    fn unknown_encodings_do_not_panic() {
        for &word in &[0xfc00_0000u32, 0x0000_003f, 0x0414_0000, 0x4220_0000, 0x4600_0000] {
            assert!(format!("{:?}", Instr(word)).starts_with("unk"));
        }
    }
}
