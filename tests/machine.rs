use byteorder::{BigEndian, ByteOrder};

use n64core::cpu::{Cpu, Instr};
use n64core::{Bus, Config, Rom, N64};

// Field packing for the handful of encodings used below.
fn i_type(op: u32, rs: u32, rt: u32, imm: u16) -> Instr {
    Instr(op << 26 | rs << 21 | rt << 16 | imm as u32)
}

fn r_type(funct: u32, rs: u32, rt: u32, rd: u32) -> Instr {
    Instr(rs << 21 | rt << 16 | rd << 11 | funct)
}

#[test]
fn r0_survives_every_kind_of_write() {
    let mut cpu = Cpu::new();
    let mut bus = Bus::default();
    bus.write_u32(0x100, 0xdead_beef);
    let writers = [
        i_type(0x0f, 0, 0, 0x1234),   // lui
        i_type(0x09, 0, 0, 0xffff),   // addiu
        i_type(0x23, 0, 0, 0x100),    // lw
        r_type(0x27, 0, 0, 0),        // nor
        Instr(0x0c00_0000),           // jal also only touches ra
    ];
    for &instr in &writers {
        cpu.execute(instr, 0x8000_0000, &mut bus);
        assert_eq!(cpu.read_gpr(0), 0, "{:?}", instr);
    }
}

#[test]
fn arithmetic_wraps() {
    let mut cpu = Cpu::new();
    let mut bus = Bus::default();
    for &(a, b) in &[(0xffff_ffffu32, 1u32), (0x8000_0000, 0x8000_0000), (0, 1), (0x7fff_ffff, 0xffff_ffff)] {
        cpu.set_gpr(1, a);
        cpu.set_gpr(2, b);
        cpu.execute(r_type(0x20, 1, 2, 3), 0, &mut bus);
        assert_eq!(cpu.read_gpr(3), a.wrapping_add(b));
        cpu.execute(r_type(0x22, 1, 2, 3), 0, &mut bus);
        assert_eq!(cpu.read_gpr(3), a.wrapping_sub(b));
    }
}

#[test]
fn memory_is_big_endian() {
    let mut bus = Bus::default();
    for &(addr, value) in &[(0x0u32, 0x0102_0304u32), (0x7f_fffc, 0xcafe_babe), (0x0400_0ffc, 0x8000_0001)] {
        bus.write_u32(addr, value);
        assert_eq!(bus.read_u32(addr), value);
        for i in 0..4 {
            assert_eq!(bus.read_u8(addr + i) as u32, (value >> (24 - 8 * i)) & 0xff);
        }
    }
}

#[test]
fn kseg0_and_kseg1_alias_physical() {
    let mut bus = Bus::default();
    for phys in (0..0x80_0000u32).step_by(0x1_2345) {
        bus.write_u8(phys + 0x8000_0000, (phys >> 8) as u8);
        assert_eq!(bus.read_u8(phys), (phys >> 8) as u8);
        assert_eq!(bus.read_u8(phys + 0xa000_0000), (phys >> 8) as u8);
    }
}

#[test]
fn unmapped_accesses_are_quiet() {
    let mut bus = Bus::default();
    let before = bus.ram().to_vec();
    for addr in (0x0080_0000u32..0x03f0_0000).step_by(0x10_0000) {
        bus.write_u32(addr, 0xffff_ffff);
        assert_eq!(bus.read_u32(addr), 0);
    }
    assert_eq!(bus.ram(), &before[..]);
    assert!(bus.stats().unmapped_writes > 0);
}

#[test]
fn branch_displacement() {
    let mut cpu = Cpu::new();
    let mut bus = Bus::default();
    for &d in &[0i16, 1, -1, 100, -100, i16::MAX, i16::MIN] {
        let pc = 0x8010_0000u32;
        let next = cpu.execute(i_type(0x04, 0, 0, d as u16), pc, &mut bus);
        assert_eq!(next, pc.wrapping_add(4).wrapping_add((d as i32 as u32) << 2));
    }
}

#[test]
fn jump_target_keeps_region() {
    let mut cpu = Cpu::new();
    let mut bus = Bus::default();
    for &(pc, target) in &[(0x8000_0000u32, 0x0091800u32), (0xa400_0040, 0x3ff_ffff), (0x1000_0000, 0)] {
        let next = cpu.execute(Instr(0x0800_0000 | target), pc, &mut bus);
        assert_eq!(next, (pc & 0xf000_0000) | (target << 2));
    }
}

#[test]
fn dp_end_write_is_one_trigger() {
    let mut n64 = N64::new(Config { pacing: false, ..Config::default() });
    let mut image = vec![0u8; 0x2000];
    image[0..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
    BigEndian::write_u32(&mut image[8..], 0x8000_1000);
    let code = [
        0x3c08_a410,  // lui   t0, 0xa410
        0x2409_0100,  // li    t1, 0x100
        0xad09_0000,  // sw    t1, 0(t0)     DPC_START
        0x2409_0108,  // li    t1, 0x108
        0xad09_0004,  // sw    t1, 4(t0)     DPC_END
        0x1000_ffff,  // beqz  zz, +0
    ];
    for (i, &word) in code.iter().enumerate() {
        BigEndian::write_u32(&mut image[0x1000 + 4 * i..], word);
    }
    n64.insert_rom(&Rom::from_bytes(image).unwrap());
    n64.power_on_reset();
    n64.run_for(6);
    assert_eq!(n64.stats().dp_processed, 1);
    // drains every 100 instructions find nothing new
    n64.run_for(1000);
    assert_eq!(n64.stats().dp_processed, 1);
    assert_eq!(n64.stats().dp_commands, 1);
    assert_eq!(n64.pc(), 0x8000_1014);
}
