use std::thread;

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, info, trace};

use crate::bus::rcp::FrameBuffer;
use crate::bus::Bus;
use crate::config::Config;
use crate::error::Result;
use crate::cpu::{Cpu, Instr};
use crate::rom::Rom;
use crate::rsp::Rsp;
use crate::save_state::SaveState;

const PIF_CIC_SEED_OFFSET: usize = 0x24;

/// Counters gathered from every part of the machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub instructions:    u64,
    pub unmapped_reads:  u64,
    pub unmapped_writes: u64,
    pub unknown_opcodes: u64,
    pub icache_hits:     u64,
    pub icache_misses:   u64,
    pub icache_lines:    u64,
    pub rsp_steps:       u64,
    pub dp_processed:    u64,
    pub dp_commands:     u64,
}

pub struct N64 {
    cpu:      Cpu,
    bus:      Bus,
    rsp:      Rsp,
    pc:       u32,
    cic_seed: Option<u32>,
    booted:   bool,
    cycles:   u64,
    config:   Config,
}

impl N64 {
    pub fn new(config: Config) -> N64 {
        N64::with_framebuffer(config, FrameBuffer::new())
    }

    /// Builds a machine that scans out into an existing framebuffer.
    pub fn with_framebuffer(mut config: Config, framebuffer: FrameBuffer) -> N64 {
        // intervals are used as divisors
        config.rsp_interval = config.rsp_interval.max(1);
        config.rdp_interval = config.rdp_interval.max(1);
        config.pace_interval = config.pace_interval.max(1);
        N64 {
            cpu:      Cpu::new(),
            bus:      Bus::with_framebuffer(config.icache, framebuffer),
            rsp:      Rsp::default(),
            pc:       0,
            cic_seed: None,
            booted:   false,
            cycles:   0,
            config,
        }
    }

    /// Copies the image into the cartridge window and RDRAM, and points the
    /// CPU at the entry point.
    pub fn insert_rom(&mut self, rom: &Rom) {
        self.bus.insert_cart(rom.data());
        self.pc = rom.header().entry_point;
        self.cic_seed = rom.cic_seed();
        self.booted = false;
    }

    /// Sets up the state the PIF boot code would leave.  Only the first call
    /// after a ROM insert has an effect.
    pub fn power_on_reset(&mut self) {
        if self.booted {
            return;
        }
        self.cpu.power_on_reset(self.pc);
        self.bus.power_on_reset();

        let pif_ram = self.bus.pif_ram_mut();
        BigEndian::write_u32(&mut pif_ram[0..], 0);
        if let Some(seed) = self.cic_seed {
            BigEndian::write_u32(&mut pif_ram[PIF_CIC_SEED_OFFSET..], seed);
        }

        self.booted = true;
        info!("booted at {:#010x}", self.pc);
    }

    /// One iteration of the driving loop: a CPU instruction plus whatever
    /// periodic work falls on this cycle.
    pub fn step(&mut self) {
        let instr = Instr(self.bus.fetch_instr(self.pc));
        if self.config.trace_instructions {
            trace!("{:#010x}: {:?}", self.pc, instr);
        }
        self.pc = self.cpu.execute(instr, self.pc, &mut self.bus);
        self.cycles += 1;

        if self.cycles % self.config.rsp_interval as u64 == 0 && !self.bus.rsp_halted() {
            self.rsp.step(&mut self.bus);
        }
        if self.cycles % self.config.rdp_interval as u64 == 0 {
            self.bus.dp_drain();
        }
        if self.cycles % self.config.pace_interval as u64 == 0 {
            self.bus.vi_cycle();
            if self.config.pacing {
                thread::sleep(self.config.pace_sleep);
            }
        }
    }

    /// Runs `n` iterations without pacing.
    pub fn run_for(&mut self, n: u64) {
        let pacing = std::mem::replace(&mut self.config.pacing, false);
        for _ in 0..n {
            self.step();
        }
        self.config.pacing = pacing;
        debug!("ran {} instructions, now at {:#010x}", n, self.pc);
    }

    /// True when the step just taken completed a pacing period.
    pub fn at_pace_boundary(&self) -> bool {
        self.cycles % self.config.pace_interval as u64 == 0
    }

    /// Snapshots the CPU registers, the writable memories and the
    /// instruction count.
    pub fn save_state(&self) -> SaveState {
        let bus = &self.bus;
        SaveState::new(self.cpu.save(self.pc), bus.ram(), bus.sp_dmem(), bus.sp_imem(),
                       bus.pif_ram(), self.cpu.stats().instructions)
    }

    /// Puts the machine back into a saved state.  The instruction cache
    /// is flushed; register blocks keep their current values.
    pub fn load_state(&mut self, state: &SaveState) -> Result<()> {
        state.validate()?;
        self.cpu.restore(&state.cpu, state.instructions);
        self.bus.restore_memories(&state.rdram, &state.sp_dmem, &state.sp_imem, &state.pif_ram);
        self.pc = state.cpu.pc;
        self.cycles = state.instructions;
        self.booted = true;
        info!("state restored at {:#010x}", self.pc);
        Ok(())
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn stats(&self) -> Stats {
        let bus = self.bus.stats();
        let cpu = self.cpu.stats();
        let icache = self.bus.icache();
        let dp = self.bus.dp();
        Stats {
            instructions:    cpu.instructions,
            unmapped_reads:  bus.unmapped_reads,
            unmapped_writes: bus.unmapped_writes,
            unknown_opcodes: cpu.unknown_opcodes,
            icache_hits:     icache.hits,
            icache_misses:   icache.misses,
            icache_lines:    icache.len() as u64,
            rsp_steps:       self.rsp.steps(),
            dp_processed:    dp.process_count,
            dp_commands:     dp.commands.total,
        }
    }
}
