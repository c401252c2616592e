//! # Trellis Supervisor Binary
//!
//! Boots a module system from a TOML configuration file, runs until a
//! shutdown signal arrives, then stops every instance in reverse order.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default configuration
//! trellis --config config/system.toml
//!
//! # Verbose logging
//! trellis -c config/system.toml -v
//!
//! # JSON logs for ingestion
//! trellis -c config/system.toml --json
//!
//! # List the registered module types and exit
//! trellis --list-types
//! ```

mod modules;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;
use trellis_core::{ModuleFactory, SystemConfig, SystemManager};

/// Trellis - firmware-style module supervisor
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version)]
#[command(about = "Module supervisor: boots, runs and stops a configured module system")]
#[command(long_about = None)]
struct Args {
    /// Path to the system configuration file
    #[arg(short, long, default_value = "config/system.toml")]
    config: PathBuf,

    /// List registered module types and exit
    #[arg(long)]
    list_types: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("supervisor startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("Trellis v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut factory = ModuleFactory::new();
    modules::register_builtin(&mut factory);

    if args.list_types {
        for module_type in factory.list_types() {
            println!("{module_type}");
        }
        return Ok(());
    }

    info!("Loading system config from {:?}", args.config);
    let system = SystemConfig::load(&args.config)?;
    info!("{} module descriptor(s) declared", system.modules.len());

    let mut manager = SystemManager::new(factory);
    manager.boot(system)?;
    for module in manager.modules() {
        info!(
            "  {} ({}, level {}): {}",
            module.name, module.module_type, module.level, module.status
        );
    }

    // Setup signal handler.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    manager.shutdown();
    info!("Trellis shutdown complete");
    Ok(())
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
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
