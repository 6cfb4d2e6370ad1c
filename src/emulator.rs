//! The host-facing core: owns the machine while halted and lends it to a
//! worker thread while running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::bus::rcp::FrameBuffer;
use crate::config::Config;
use crate::error::{EmuError, Result};
use crate::n64::{Stats, N64};
use crate::rom::{Rom, RomHeader};
use crate::save_state::SaveSlots;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Halted,
    Running,
}

/// What the worker and the host both see.
#[derive(Default)]
struct Shared {
    should_run: AtomicBool,
    last_error: Mutex<Option<String>>,
    stats:      Mutex<Stats>,
}

pub struct EmulatorCore {
    config:      Config,
    rom:         Option<Rom>,
    machine:     Option<N64>,
    handle:      Option<JoinHandle<N64>>,
    shared:      Arc<Shared>,
    /// Outlives every machine, so handles taken by the host stay live.
    framebuffer: FrameBuffer,
    slots:       SaveSlots,
}

impl EmulatorCore {
    pub fn new(config: Config) -> EmulatorCore {
        EmulatorCore {
            config,
            rom:         None,
            machine:     None,
            handle:      None,
            shared:      Arc::new(Shared::default()),
            framebuffer: FrameBuffer::new(),
            slots:       SaveSlots::new(),
        }
    }

    /// Loads a ROM image and builds a fresh machine around it.  Returns
    /// false (and records the error) if the file can't be used or the core
    /// is running.
    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let result = self.try_load_rom(path.as_ref());
        self.report(result)
    }

    fn try_load_rom(&mut self, path: &Path) -> Result<()> {
        if self.is_running() {
            return Err(EmuError::AlreadyRunning);
        }
        self.reclaim();
        let rom = Rom::load(path)?;
        info!("loaded {}", path.display());
        self.rom = Some(rom);
        // states of the previous cartridge don't apply
        self.slots.clear();
        self.rebuild()
    }

    /// Boots the machine if needed and starts the driving loop on a worker
    /// thread.  Does nothing if already running.
    pub fn start_emulation(&mut self) -> bool {
        if self.is_running() {
            return true;
        }
        let result = self.try_start(N64::step);
        self.report(result)
    }

    fn try_start<F>(&mut self, step: F) -> Result<()>
        where F: FnMut(&mut N64) + Send + 'static
    {
        self.reclaim();
        let mut n64 = self.machine.take().ok_or(EmuError::NoRom)?;
        n64.power_on_reset();

        *self.shared.last_error.lock() = None;
        self.shared.should_run.store(true, Ordering::SeqCst);
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("n64-cpu".to_owned())
            .spawn(move || run(n64, shared, step));
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                info!("emulation started");
                Ok(())
            }
            Err(err) => {
                self.shared.should_run.store(false, Ordering::SeqCst);
                // the machine went down with the closure
                self.rebuild()?;
                Err(err.into())
            }
        }
    }

    /// Stops the driving loop and takes the machine back.  Does nothing
    /// while halted.
    pub fn stop_emulation(&mut self) {
        self.shared.should_run.store(false, Ordering::SeqCst);
        if self.handle.is_some() {
            self.reclaim();
            info!("emulation stopped");
        }
    }

    /// Stops, then reloads the current ROM into a fresh machine that boots
    /// again on the next start.
    pub fn reset_emulation(&mut self) -> bool {
        self.stop_emulation();
        let result = self.rebuild();
        self.report(result)
    }

    /// Snapshots the halted machine into `slot`.
    pub fn save_state(&mut self, slot: usize) -> bool {
        let result = self.try_save_state(slot);
        self.report(result)
    }

    fn try_save_state(&mut self, slot: usize) -> Result<()> {
        if self.is_running() {
            return Err(EmuError::AlreadyRunning);
        }
        self.reclaim();
        let n64 = self.machine.as_ref().ok_or(EmuError::NoRom)?;
        self.slots.save_to_slot(slot, n64.save_state())?;
        info!("state saved to slot {}", slot);
        Ok(())
    }

    /// Restores the halted machine from `slot`.
    pub fn load_state(&mut self, slot: usize) -> bool {
        let result = self.try_load_state(slot);
        self.report(result)
    }

    fn try_load_state(&mut self, slot: usize) -> Result<()> {
        if self.is_running() {
            return Err(EmuError::AlreadyRunning);
        }
        self.reclaim();
        let n64 = self.machine.as_mut().ok_or(EmuError::NoRom)?;
        n64.load_state(self.slots.load_from_slot(slot)?)?;
        *self.shared.stats.lock() = n64.stats();
        info!("state loaded from slot {}", slot);
        Ok(())
    }

    pub fn has_state(&self, slot: usize) -> bool {
        self.slots.is_occupied(slot)
    }

    pub fn state(&self) -> State {
        if self.is_running() { State::Running } else { State::Halted }
    }

    /// False once the loop has been stopped or died on its own.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.shared.should_run.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }

    pub fn framebuffer(&self) -> FrameBuffer {
        self.framebuffer.clone()
    }

    /// Live counters while halted; the worker's last published snapshot
    /// while running.
    pub fn stats(&self) -> Stats {
        match &self.machine {
            Some(n64) => n64.stats(),
            None => *self.shared.stats.lock(),
        }
    }

    pub fn rom_header(&self) -> Option<&RomHeader> {
        self.rom.as_ref().map(Rom::header)
    }

    /// The machine, available only while halted.
    pub fn machine(&self) -> Option<&N64> {
        self.machine.as_ref()
    }

    pub fn pc(&self) -> Option<u32> {
        self.machine.as_ref().map(N64::pc)
    }

    fn rebuild(&mut self) -> Result<()> {
        let rom = self.rom.as_ref().ok_or(EmuError::NoRom)?;
        self.framebuffer.clear();
        let mut n64 = N64::with_framebuffer(self.config.clone(), self.framebuffer.clone());
        n64.insert_rom(rom);
        *self.shared.stats.lock() = n64.stats();
        self.machine = Some(n64);
        Ok(())
    }

    /// Joins a finished or stopping worker and takes its machine.
    fn reclaim(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };
        self.shared.should_run.store(false, Ordering::SeqCst);
        match handle.join() {
            Ok(n64) => self.machine = Some(n64),
            Err(payload) => {
                let message = panic_message(&*payload);
                error!("emulation thread died: {}", message);
                *self.shared.last_error.lock() = Some(message);
                if let Err(err) = self.rebuild() {
                    warn!("cannot rebuild machine: {}", err);
                }
            }
        }
    }

    fn report(&self, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                error!("{}", err);
                *self.shared.last_error.lock() = Some(err.to_string());
                false
            }
        }
    }
}

impl Default for EmulatorCore {
    fn default() -> EmulatorCore {
        EmulatorCore::new(Config::default())
    }
}

impl Drop for EmulatorCore {
    fn drop(&mut self) {
        self.stop_emulation();
    }
}

/// The worker: runs pacing slices of `step` until told to stop or
/// something panics.
fn run<F>(mut n64: N64, shared: Arc<Shared>, mut step: F) -> N64
    where F: FnMut(&mut N64)
{
    while shared.should_run.load(Ordering::Relaxed) {
        let slice = panic::catch_unwind(AssertUnwindSafe(|| {
            loop {
                step(&mut n64);
                if n64.at_pace_boundary() || !shared.should_run.load(Ordering::Relaxed) {
                    break;
                }
            }
        }));
        if let Err(payload) = slice {
            let err = EmuError::Fatal { pc: n64.pc(), message: panic_message(&*payload) };
            error!("{}", err);
            *shared.last_error.lock() = Some(err.to_string());
            shared.should_run.store(false, Ordering::SeqCst);
            break;
        }
        *shared.stats.lock() = n64.stats();
    }
    *shared.stats.lock() = n64.stats();
    n64
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use byteorder::{BigEndian, ByteOrder};

    use super::*;

    fn core_with_rom() -> EmulatorCore {
        let mut image = vec![0; 0x2000];
        image[0..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
        BigEndian::write_u32(&mut image[8..], 0x8000_1000);
        let mut core = EmulatorCore::new(Config { pacing: false, ..Config::default() });
        core.rom = Some(Rom::from_bytes(image).unwrap());
        core.rebuild().unwrap();
        core
    }

    fn wait_until_halted(core: &EmulatorCore) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while core.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn panic_in_loop_is_fatal_and_recoverable() {
        let mut core = core_with_rom();
        let mut steps = 0;
        core.try_start(move |n64: &mut N64| {
            steps += 1;
            if steps == 10 {
                panic!("bad step");
            }
            n64.step();
        }).unwrap();
        wait_until_halted(&core);

        assert!(!core.is_running());
        assert_eq!(core.state(), State::Halted);
        let error = core.last_error().unwrap();
        // nine nops ran before the failing step
        assert!(error.contains("0x80001024"), "{}", error);
        assert!(error.contains("bad step"), "{}", error);
        assert_eq!(core.stats().instructions, 9);

        // the machine comes back and keeps going
        assert!(core.start_emulation());
        assert!(core.last_error().is_none());
        let deadline = Instant::now() + Duration::from_secs(5);
        while core.stats().instructions <= 9 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        core.stop_emulation();
        assert!(core.pc().unwrap() > 0x8000_1024);
        assert!(core.stats().instructions > 9);
    }

    #[test]
    fn states_need_a_halted_machine() {
        let mut core = EmulatorCore::default();
        assert!(!core.save_state(0));
        assert!(!core.load_state(0));

        let mut core = core_with_rom();
        assert!(!core.load_state(0));
        assert!(core.last_error().unwrap().contains("empty"));
        assert!(core.save_state(0));
        assert!(core.has_state(0));
        assert!(!core.save_state(99));

        assert!(core.start_emulation());
        assert!(!core.save_state(1));
        assert!(!core.load_state(0));
        assert!(core.last_error().unwrap().contains("already running"));
        core.stop_emulation();
        assert!(!core.has_state(1));
        assert!(core.load_state(0));
        assert_eq!(core.pc(), Some(0x8000_1000));
    }

    #[test]
    fn start_without_rom_fails() {
        let mut core = EmulatorCore::default();
        assert!(!core.start_emulation());
        assert_eq!(core.state(), State::Halted);
        assert!(core.last_error().is_some());
    }

    #[test]
    fn stop_while_halted_is_a_noop() {
        let mut core = EmulatorCore::default();
        core.stop_emulation();
        assert!(!core.is_running());
        assert!(core.last_error().is_none());
    }

    #[test]
    fn missing_file() {
        let mut core = EmulatorCore::default();
        assert!(!core.load_rom("/nonexistent/rom.z64"));
        assert!(core.last_error().is_some());
        assert!(core.rom_header().is_none());
    }

    #[test]
    fn panic_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"boom".to_string()), "boom");
        assert_eq!(panic_message(&5u32), "unknown panic");
    }
}
