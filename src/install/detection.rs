//! Installation state detection
//!
//! The core counts as installed when its binary exists at the destination and,
//! on Unix, carries an execute bit.

use std::path::Path;

/// Installation state enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationState {
    /// No binary at the destination
    NotInstalled,
    /// A file is there but cannot be executed (repair needed)
    PartiallyInstalled,
    FullyInstalled,
}

/// Check the binary at `destination`
pub fn check_installation_state(destination: &Path) -> InstallationState {
    let Ok(meta) = std::fs::metadata(destination) else {
        return InstallationState::NotInstalled;
    };
    if !meta.is_file() {
        return InstallationState::NotInstalled;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return InstallationState::PartiallyInstalled;
        }
    }

    InstallationState::FullyInstalled
}
