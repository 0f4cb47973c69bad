//! vgmscan - find sound driver data in ROM and ARAM dumps
//!
//! # Commands
//!
//! - `vgmscan scan` - Detect engines and list sequences, instrument sets and samples
//! - `vgmscan engines` - List the built-in engine scanners
//! - `vgmscan search` - Find a byte pattern (with `??` wildcards) in a file
//! - `vgmscan hexdump` - Show raw bytes at an offset

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::scan::OutputFormat;

#[derive(Parser)]
#[command(name = "vgmscan")]
#[command(about = "Detect and parse game sound driver data in ROM and ARAM dumps")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files for known sound engines
    Scan {
        /// Files to scan (ROM images, ARAM captures, memory dumps)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Run only this engine instead of sweeping all of them
        #[arg(short, long)]
        engine: Option<String>,

        /// JSON hint file with table addresses
        #[arg(long)]
        hints: Option<PathBuf>,

        /// TOML scan configuration
        #[arg(short, long, env = "VGMSCAN_CONFIG")]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List built-in engine scanners
    Engines,

    /// Search a file for a byte pattern
    Search {
        file: PathBuf,

        /// Hex bytes with `??` wildcards, e.g. "8D ?? 5D"
        #[arg(short, long)]
        pattern: String,

        /// Maximum number of matches to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Dump raw bytes from a file
    Hexdump {
        file: PathBuf,

        /// Start offset (hex, with or without 0x)
        #[arg(short, long, default_value = "0")]
        offset: String,

        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Show the ASCII column
        #[arg(short, long)]
        ascii: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vgmscan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            files,
            engine,
            hints,
            config,
            format,
            output,
        } => commands::scan::run(commands::scan::ScanArgs {
            files,
            engine,
            hints,
            config,
            format,
            output,
        }),
        Commands::Engines => commands::engines::run(),
        Commands::Search {
            file,
            pattern,
            limit,
        } => commands::search::run(&file, &pattern, limit),
        Commands::Hexdump {
            file,
            offset,
            size,
            ascii,
        } => {
            let offset = commands::hex_utils::parse_hex_offset(&offset)?;
            commands::hexdump::run(&file, offset, size, ascii)
        }
    }
}
