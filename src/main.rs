mod cli;
mod runners;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use xcore_installer::InstallerConfig;
use xcore_installer::install::InstallationState;

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn load_config(args: &cli::Args) -> Result<InstallerConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => InstallerConfig::default_path()?,
    };
    let mut config = InstallerConfig::load_or_init(&path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

async fn real_main() -> Result<i32> {
    let args = cli::Args::parse();

    match args.sub.as_ref().unwrap_or(&cli::Cmd::Install { force: false }) {
        cli::Cmd::Install { force } => {
            let config = load_config(&args)?;
            runners::run_install(&config, *force).await?;
        }
        cli::Cmd::Download { url, dest } => {
            let config = load_config(&args)?;
            runners::run_download(&config, url, dest).await?;
        }
        cli::Cmd::Extract {
            archive,
            name,
            dest,
        } => runners::run_extract(archive, name, dest).await?,
        cli::Cmd::Status => {
            let config = load_config(&args)?;
            if runners::run_status(&config)? != InstallationState::FullyInstalled {
                return Ok(1);
            }
        }
    }
    Ok(0)
}
