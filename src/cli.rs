use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI entry point for operating a frontier store from the command line.
/// Exit codes: 0=success, 2=invalid arguments, 3=I/O or storage error
#[derive(Parser, Debug)]
#[command(name = "recrawl")]
#[command(about = "Scheduling frontier for a continuous revisitation crawler")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load seed URLs into the frontier. Re-runnable; seeds already queued
    /// are deduplicated away.
    Seed {
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory holding the frontier store"
        )]
        data_dir: PathBuf,

        #[arg(required = true, help = "Seed URLs to schedule")]
        urls: Vec<String>,

        #[arg(
            long,
            default_value_t = 1,
            help = "Concurrent fetches permitted per origin for new queues"
        )]
        valence: u32,
    },

    /// Print the per-origin queue report for an existing frontier store.
    Report {
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory holding the frontier store"
        )]
        data_dir: PathBuf,

        #[arg(long, help = "Single-line summary instead of the full table")]
        one_line: bool,
    },

    /// Print aggregate frontier counters.
    Stats {
        #[arg(
            short,
            long,
            default_value = "./data",
            help = "Directory holding the frontier store"
        )]
        data_dir: PathBuf,

        #[arg(long, help = "Emit JSON instead of the human-readable line")]
        json: bool,
    },
}

impl Cli {
    /// Parse CLI arguments; on a usage error clap prints help and exits 2.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
