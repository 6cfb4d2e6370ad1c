use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;

use n64core::{Config, EmulatorCore};

/// Runs a Nintendo 64 ROM headless and reports what the core did.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// ROM image to run (.z64, .v64 or .n64).
    rom: Option<PathBuf>,
    /// Stop after this many seconds instead of waiting for the core to halt.
    #[arg(short, long)]
    seconds: Option<f64>,
    /// Run as fast as the host allows
    #[arg(long, default_value_t = false)]
    no_pacing: bool,
    /// Fetch every instruction from the bus
    #[arg(long, default_value_t = false)]
    no_icache: bool,
    /// Log each executed instruction (needs RUST_LOG=n64core=trace and a debug build)
    #[arg(long, default_value_t = false)]
    trace: bool,
    /// Instructions between RSP steps
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    rsp_interval: u32,
    /// Instructions between RDP command drains
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    rdp_interval: u32,
    /// Instructions between display refreshes
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pace_interval: u32,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            rsp_interval:       self.rsp_interval,
            rdp_interval:       self.rdp_interval,
            pace_interval:      self.pace_interval,
            pacing:             !self.no_pacing,
            icache:             !self.no_icache,
            trace_instructions: self.trace,
            ..Config::default()
        }
    }
}

fn setup_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("n64core=info"));
    fmt().with_env_filter(env_filter).init();
}

fn main() -> ExitCode {
    setup_tracing();
    let args = Args::parse();

    let rom = match &args.rom {
        Some(rom) => rom,
        None => {
            eprintln!("no ROM given, nothing to run");
            return ExitCode::from(2);
        }
    };

    let mut core = EmulatorCore::new(args.config());
    if !core.load_rom(rom) {
        eprintln!("could not load {}: {}", rom.display(),
                  core.last_error().unwrap_or_default());
        return ExitCode::FAILURE;
    }
    if let Some(header) = core.rom_header() {
        println!("{}", header);
    }

    if !core.start_emulation() {
        eprintln!("could not start: {}", core.last_error().unwrap_or_default());
        return ExitCode::FAILURE;
    }
    let deadline = args.seconds.map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    while core.is_running() {
        if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }
    core.stop_emulation();
    info!("halted at {:#010x}", core.pc().unwrap_or_default());

    let stats = core.stats();
    println!("instructions:     {}", stats.instructions);
    println!("unknown opcodes:  {}", stats.unknown_opcodes);
    println!("unmapped r/w:     {} / {}", stats.unmapped_reads, stats.unmapped_writes);
    println!("icache hit/miss:  {} / {} ({} lines)",
             stats.icache_hits, stats.icache_misses, stats.icache_lines);
    println!("RSP steps:        {}", stats.rsp_steps);
    println!("RDP drains:       {} ({} commands)", stats.dp_processed, stats.dp_commands);

    match core.last_error() {
        Some(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}
