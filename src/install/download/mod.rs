//! Core package download and extraction
//!
//! ## Module Organization
//!
//! - `platform` - Platform detection and release asset table
//! - `core` - Resumable download with throttled progress
//! - `extract` - Single-binary extraction from the zip package
//! - `state` - Process-wide download-in-progress flag

mod core;
mod extract;
mod platform;
mod state;

// Re-export public API
pub use self::core::{DownloadOutcome, Downloader};
pub use extract::{extract_binary, extract_binary_blocking};
pub use platform::{PLATFORM_ASSETS, Platform, PlatformAsset};
pub use state::is_downloading;
