//! buscribe CLI - capture and catalog wallpad bus commands.
//!
//! This is the binary entry point. See the `buscribe` library for the core
//! functionality.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use buscribe::{commands, Config};
use clap::{Parser, Subcommand};

// CLI
#[derive(Parser)]
#[command(name = "buscribe")]
#[command(version)]
#[command(about = "Reverse-engineer an undocumented home-automation bus over a TCP bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the frame(s) for one command via baseline/action trials
    Capture {
        /// Bridge host (e.g. 192.168.0.222)
        host: String,
        /// Bridge TCP port (e.g. 8899)
        port: u16,
        /// Command name to store (e.g. living_room_light)
        name: String,
        /// Capture an ON/OFF pair instead of a single action
        #[arg(long)]
        paired: bool,
    },
    /// Stream decoded bus traffic until interrupted
    Monitor {
        /// Bridge host
        host: String,
        /// Bridge TCP port
        port: u16,
    },
    /// List all cataloged commands
    List,
    /// Delete one cataloged command
    Delete {
        /// Command name to delete
        name: String,
    },
    /// Erase the whole catalog (asks for a typed confirmation)
    Wipe,
    /// Replay a cataloged command on the bus
    Send {
        /// Bridge host
        host: String,
        /// Bridge TCP port
        port: u16,
        /// Command name to send
        name: String,
        /// Send the OFF half of a paired command
        #[arg(long)]
        off: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Sets up file logging so log output doesn't interleave with the
/// interactive prompts. `BUSCRIBE_LOG_FILE` overrides the default location
/// in the config directory.
fn init_logging() -> Result<()> {
    let log_path = if let Ok(path) = std::env::var("BUSCRIBE_LOG_FILE") {
        std::path::PathBuf::from(path)
    } else {
        Config::config_dir()?.join("buscribe.log")
    };
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("Failed to create log file at {}", log_path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    // One shared cancel flag: Ctrl-C abandons the running session (checked
    // between transport polls) instead of killing the process mid-write.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            host,
            port,
            name,
            paired,
        } => {
            commands::capture::run(&host, port, &name, paired, cancel)?;
        }
        Commands::Monitor { host, port } => {
            commands::monitor::run(&host, port, cancel)?;
        }
        Commands::List => {
            commands::catalog::list()?;
        }
        Commands::Delete { name } => {
            commands::catalog::delete(&name)?;
        }
        Commands::Wipe => {
            commands::catalog::wipe()?;
        }
        Commands::Send {
            host,
            port,
            name,
            off,
        } => {
            commands::catalog::send(&host, port, &name, off)?;
        }
        Commands::Config { init } => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            if init {
                config.save()?;
                println!("Written to {}", Config::config_dir()?.join("config.json").display());
            }
        }
    }

    Ok(())
}
