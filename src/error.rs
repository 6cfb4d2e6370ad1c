use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, EmuError>;

#[derive(Error, Debug)]
pub enum EmuError {
    #[error("Input output error: {0}")]
    Io(#[from] io::Error),
    #[error("ROM image is too small to hold a header ({0} bytes)")]
    RomTooSmall(usize),
    #[error("Emulation is already running")]
    AlreadyRunning,
    #[error("No ROM has been loaded")]
    NoRom,
    #[error("Emulation error at PC {pc:#010x}: {message}")]
    Fatal { pc: u32, message: String },
    #[error("Save state {operation} failed: {reason}")]
    SaveState { operation: &'static str, reason: String },
}
