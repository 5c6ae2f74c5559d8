//! # Hybrid Node
//!
//! Runs one hybrid analog/DSP processing node on a registered hardware
//! backend.
//!
//! # Usage
//!
//! ```bash
//! # Simulation backend, built-in defaults, until Ctrl-C
//! hybrid_node
//!
//! # Config file, 1000 cycles, calibrate first and keep the profile
//! hybrid_node --config config/node.toml --cycles 1000 \
//!     --calibrate --calibration-file node.cal
//!
//! # Transport loopback self-test only
//! hybrid_node --link-self-test
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use hybrid_common::consts::{SYNC_PULSE_HZ, TRANSPORT_SELF_TEST_ITERATIONS};
use hybrid_common::node::config::OperatingMode;
use hybrid_common::transport::SyncPulse;
use hybrid_hal::backends::loopback::LoopbackTransport;
use hybrid_node::config::load_or_default;
use hybrid_node::link::TransportLink;
use hybrid_node::node::HybridNode;
use hybrid_node::runner::{CycleRunner, SyncTicker, rt_setup};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Hybrid Node - real-time analog/DSP processing node
#[derive(Parser, Debug)]
#[command(name = "hybrid_node")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Real-time hybrid analog/DSP processing node")]
struct Args {
    /// Node configuration TOML. A missing file means built-in defaults.
    #[arg(short, long, default_value = "config/node.toml")]
    config: PathBuf,

    /// Override the backend named in the config file.
    #[arg(short, long)]
    backend: Option<String>,

    /// Stop after this many cycles (default: run until Ctrl-C).
    #[arg(long)]
    cycles: Option<u64>,

    /// Run the calibration routine before starting.
    #[arg(long)]
    calibrate: bool,

    /// Calibration record to load at startup, and to save after --calibrate.
    #[arg(long, value_name = "FILE")]
    calibration_file: Option<PathBuf>,

    /// Run the transport loopback self-test and exit.
    #[arg(long)]
    link_self_test: bool,

    /// CPU core to pin the cycle thread to (rt builds).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt builds).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Hybrid Node v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Hybrid Node shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.link_self_test {
        return link_self_test();
    }

    let file = load_or_default(Some(&args.config))?;
    info!("Service '{}'", file.shared.service_name);
    let backend = args.backend.as_deref().unwrap_or(&file.backend.name);

    let registry = hybrid_hal::default_registry();
    info!("Available backends: {:?}", registry.list_backends());
    let port = registry.create_port(backend, &file.backend.options)?;

    let mut node = HybridNode::new(port);
    node.init(file.node)?;
    info!("Firmware {}", node.version());

    if let Some(path) = &args.calibration_file {
        if !args.calibrate {
            if path.exists() {
                node.load_calibration(path)?;
            } else {
                warn!("Calibration file {} not found, running uncalibrated", path.display());
            }
        }
    }

    if args.calibrate || node.config().mode == OperatingMode::Calibration {
        let report = node.calibrate()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if let Some(path) = &args.calibration_file {
            node.save_calibration(path)?;
        }
    }

    if node.config().mode == OperatingMode::Calibration {
        info!("Calibration mode: not starting the cycle");
        println!("{}", serde_json::to_string_pretty(&node.status())?);
        return Ok(());
    }

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let pulse = Arc::new(SyncPulse::new());
    let mut ticker = SyncTicker::spawn(pulse.clone(), SYNC_PULSE_HZ)?;

    node.start()?;
    let mut runner = CycleRunner::new(node)?.with_sync_pulse(pulse);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let executed = match args.cycles {
        Some(n) => runner.run_for(n)?,
        None => runner.run_until(&running)?,
    };
    info!("Executed {executed} cycles");

    ticker.stop();
    let mut node = runner.into_node();
    if node.is_running() {
        node.stop()?;
    }
    println!("{}", serde_json::to_string_pretty(&node.status())?);
    Ok(())
}

fn link_self_test() -> Result<(), Box<dyn std::error::Error>> {
    let mut link = TransportLink::new(LoopbackTransport::new(0), 64, 2)?;
    let report = link.self_test(TRANSPORT_SELF_TEST_ITERATIONS)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.passed {
        Ok(())
    } else {
        Err("transport self-test failed".into())
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
