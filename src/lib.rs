//! Resumable installer for the Xray core binary.

pub mod config;
pub mod install;

pub use config::InstallerConfig;
pub use install::{InstallError, Platform, ensure_installed};
