use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Xray core installer")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Override the release download root from the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Sub‑commands (install, download, etc.)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Download and install the core (default if no sub‑command)
    Install {
        /// Reinstall even when the binary is already present
        #[arg(long)]
        force: bool,
    },
    /// Download a URL to a file, resuming a previous partial download
    Download { url: String, dest: PathBuf },
    /// Extract one binary from a zip archive
    Extract {
        archive: PathBuf,
        name: String,
        dest: PathBuf,
    },
    /// Check installation status (Exit 0 = installed, 1 = not installed)
    Status,
}
