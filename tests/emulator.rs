use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use byteorder::{BigEndian, ByteOrder};
use tempfile::NamedTempFile;

use n64core::rom::ByteOrder as RomOrder;
use n64core::{Config, EmulatorCore, State};

const ENTRY: u32 = 0x8024_6000;

fn test_image(code: &[u32]) -> Vec<u8> {
    let mut image = vec![0u8; 0x0030_0000];
    image[0..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
    BigEndian::write_u32(&mut image[8..], ENTRY);
    image[32..39].copy_from_slice(b"TESTROM");
    for (i, &word) in code.iter().enumerate() {
        BigEndian::write_u32(&mut image[0x24_6000 + 4 * i..], word);
    }
    image
}

fn write_rom(image: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(image).unwrap();
    file.flush().unwrap();
    file
}

fn headless() -> EmulatorCore {
    EmulatorCore::new(Config { pacing: false, ..Config::default() })
}

#[test]
fn header_scenario() {
    let file = write_rom(&test_image(&[]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    assert_eq!(core.pc(), Some(ENTRY));
    assert_eq!(core.rom_header().unwrap().name, "TESTROM");
    assert_eq!(core.state(), State::Halted);
}

#[test]
fn byte_swapped_scenario() {
    let mut image = test_image(&[]);
    RomOrder::ByteSwapped.normalize(&mut image);
    assert_eq!(&image[..2], &[0x37, 0x80]);
    let file = write_rom(&image);
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    let bus = core.machine().unwrap().bus();
    assert_eq!(&bus.cart_rom()[..2], &[0x80, 0x37]);
    assert_eq!(&bus.ram()[..2], &[0x80, 0x37]);
    assert_eq!(core.pc(), Some(ENTRY));
}

#[test]
fn tiny_rom_is_rejected() {
    let file = write_rom(&[0x80, 0x37, 0x12, 0x40, 0, 0, 0, 0]);
    let mut core = headless();
    assert!(!core.load_rom(file.path()));
    assert!(core.last_error().unwrap().contains("too small"));
    assert!(!core.start_emulation());
}

#[test]
fn start_and_stop() {
    let file = write_rom(&test_image(&[
        0x2408_0000,  // li    t0, 0
        0x2508_0001,  // addiu t0, t0, 1
        0x1000_fffe,  // beqz  zz, -4
    ]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    assert!(core.start_emulation());
    assert!(core.is_running());
    // a second start is a no-op
    assert!(core.start_emulation());
    assert!(!core.load_rom(file.path()));
    thread::sleep(Duration::from_millis(50));
    core.stop_emulation();
    assert_eq!(core.state(), State::Halted);

    let stats = core.stats();
    assert!(stats.instructions > 0);
    let pc = core.pc().unwrap();
    assert!(pc >= ENTRY + 4 && pc <= ENTRY + 8, "pc {:#x}", pc);
    let machine = core.machine().unwrap();
    assert!(machine.is_booted());
    assert_eq!(machine.cpu().read_gpr(0), 0);
    assert!(machine.cpu().read_gpr(8) > 0);
}

#[test]
fn restart_keeps_machine_state() {
    let file = write_rom(&test_image(&[
        0x2508_0001,  // addiu t0, t0, 1
        0x1000_fffe,  // beqz  zz, -4
    ]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    core.stop_emulation();
    let first = core.machine().unwrap().cpu().read_gpr(8);
    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    core.stop_emulation();
    assert!(core.machine().unwrap().cpu().read_gpr(8) > first);
}

#[test]
fn reset_reloads_rom() {
    let file = write_rom(&test_image(&[
        0x2508_0001,  // addiu t0, t0, 1
        0x1000_fffe,  // beqz  zz, -4
    ]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    assert!(core.reset_emulation());
    assert!(!core.is_running());
    let machine = core.machine().unwrap();
    assert!(!machine.is_booted());
    assert_eq!(machine.pc(), ENTRY);
    assert_eq!(machine.cpu().read_gpr(8), 0);
}

#[test]
fn framebuffer_is_shared() {
    let file = write_rom(&test_image(&[]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    let fb = core.framebuffer();
    assert_eq!(fb.snapshot().len(), 640 * 480 * 4);
}

// Sets up a 32 bpp frame at 0x100 with an opaque red first pixel, then spins.
const RED_PIXEL: [u32; 10] = [
    0x3c08_a440,  // lui   t0, 0xa440
    0x3409_0003,  // ori   t1, zz, 0x3
    0xad09_0000,  // sw    t1, 0(t0)
    0x3409_0100,  // ori   t1, zz, 0x100
    0xad09_0004,  // sw    t1, 4(t0)
    0x3c0a_ff00,  // lui   t2, 0xff00
    0x354a_00ff,  // ori   t2, t2, 0xff
    0x3c0b_8000,  // lui   t3, 0x8000
    0xad6a_0100,  // sw    t2, 256(t3)
    0x1000_ffff,  // beqz  zz, +0
];

fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
    true
}

#[test]
fn framebuffer_handle_survives_reset() {
    let file = write_rom(&test_image(&RED_PIXEL));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    let fb = core.framebuffer();

    assert!(core.start_emulation());
    assert!(wait_for(|| fb.snapshot()[..4] == [0xff, 0x00, 0x00, 0xff]));
    assert!(core.reset_emulation());
    // the reset blanks the display
    assert_eq!(&fb.snapshot()[..4], &[0, 0, 0, 0]);

    assert!(core.start_emulation());
    assert!(wait_for(|| fb.snapshot()[..4] == [0xff, 0x00, 0x00, 0xff]));
    core.stop_emulation();

    // a new cartridge keeps feeding the same handle too
    assert!(core.load_rom(file.path()));
    assert!(core.start_emulation());
    assert!(wait_for(|| fb.snapshot()[..4] == [0xff, 0x00, 0x00, 0xff]));
    core.stop_emulation();
}

#[test]
fn save_and_load_state_slots() {
    let file = write_rom(&test_image(&[
        0x2508_0001,  // addiu t0, t0, 1
        0x1000_fffe,  // beqz  zz, -4
    ]));
    let mut core = headless();
    assert!(core.load_rom(file.path()));
    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    assert!(!core.save_state(2));
    core.stop_emulation();

    assert!(core.save_state(2));
    let saved_count = core.machine().unwrap().cpu().read_gpr(8);
    let saved_pc = core.pc().unwrap();
    let saved_instructions = core.stats().instructions;
    assert!(saved_count > 0);

    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    core.stop_emulation();
    assert!(core.machine().unwrap().cpu().read_gpr(8) > saved_count);

    assert!(core.load_state(2));
    assert_eq!(core.machine().unwrap().cpu().read_gpr(8), saved_count);
    assert_eq!(core.pc(), Some(saved_pc));
    assert_eq!(core.stats().instructions, saved_instructions);

    // loading doesn't reboot, the loop picks up from the snapshot
    assert!(core.start_emulation());
    thread::sleep(Duration::from_millis(20));
    core.stop_emulation();
    assert!(core.machine().unwrap().cpu().read_gpr(8) > saved_count);

    // slots belong to the cartridge they were taken from
    assert!(core.load_rom(file.path()));
    assert!(!core.has_state(2));
    assert!(!core.load_state(2));
}
