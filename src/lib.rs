//! Interpreter core for the Nintendo 64: the main CPU, a sliver of the RSP
//! and the memory-mapped bus connecting them to the rest of the RCP.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod emulator;
pub mod error;
pub mod n64;
pub mod rom;
pub mod rsp;
pub mod save_state;
pub mod util;

pub use crate::bus::Bus;
pub use crate::config::Config;
pub use crate::emulator::{EmulatorCore, State};
pub use crate::error::{EmuError, Result};
pub use crate::n64::{Stats, N64};
pub use crate::rom::{Rom, RomHeader};
pub use crate::save_state::{SaveSlots, SaveState};
