mod cpu;
pub mod cp0;
pub mod icache;
pub mod instr;

pub use self::cpu::{Cpu, CpuStats};
pub use self::instr::Instr;
