//! Binary extraction from the downloaded zip package
//!
//! Only one member is ever extracted: the first whose base name matches the
//! requested binary. It is written next to its destination first and renamed
//! into place, so a failed copy never leaves a truncated binary behind.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::install::error::{InstallError, Result};

/// Member name with directory components stripped
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Index of the first regular member whose base name equals `binary_name`
fn find_member<R: io::Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
    binary_name: &str,
) -> Result<Option<usize>> {
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|source| InstallError::ArchiveOpen {
            path: archive_path.to_path_buf(),
            source,
        })?;

        if !entry.is_dir() && base_name(entry.name()) == binary_name {
            debug!("Matched {} at index {} in {}", entry.name(), i, archive_path.display());
            return Ok(Some(i));
        }
    }
    Ok(None)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Staging path in the destination directory, e.g. `xray.exe` -> `xray.exe.tmp`
fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Copy `member` to `temp_path`, mark it executable and move it onto `dest`
fn write_member(
    member: &mut impl io::Read,
    binary_name: &str,
    temp_path: &Path,
    dest: &Path,
) -> Result<()> {
    let mut outfile = File::create(temp_path)
        .map_err(|e| InstallError::io(format!("Failed to create {}", temp_path.display()), e))?;
    io::copy(member, &mut outfile).map_err(|e| {
        InstallError::io(format!("Failed to extract {} from archive", binary_name), e)
    })?;
    outfile
        .sync_all()
        .map_err(|e| InstallError::io(format!("Failed to sync {}", temp_path.display()), e))?;
    drop(outfile);

    set_executable(temp_path).map_err(|e| {
        InstallError::io(format!("Failed to set permissions on {}", temp_path.display()), e)
    })?;
    fs::rename(temp_path, dest)
        .map_err(|e| InstallError::io(format!("Failed to move binary into {}", dest.display()), e))
}

/// Extract `binary_name` from the zip at `archive_path` to `dest` (blocking)
pub fn extract_binary_blocking(
    archive_path: &Path,
    binary_name: &str,
    dest: &Path,
) -> Result<PathBuf> {
    let zip_file = File::open(archive_path).map_err(|e| InstallError::ArchiveOpen {
        path: archive_path.to_path_buf(),
        source: ZipError::Io(e),
    })?;

    let mut archive =
        ZipArchive::new(BufReader::new(zip_file)).map_err(|source| InstallError::ArchiveOpen {
            path: archive_path.to_path_buf(),
            source,
        })?;

    let Some(index) = find_member(&mut archive, archive_path, binary_name)? else {
        return Err(InstallError::MemberNotFound {
            name: binary_name.to_string(),
            archive: archive_path.to_path_buf(),
        });
    };

    let mut member = archive.by_index(index).map_err(|source| InstallError::ArchiveOpen {
        path: archive_path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            InstallError::io(format!("Failed to create directory {}", parent.display()), e)
        })?;
    }

    let temp_path = staging_path(dest);
    if let Err(e) = write_member(&mut member, binary_name, &temp_path, dest) {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", temp_path.display(), cleanup);
            }
        }
        return Err(e);
    }

    info!("Xray extracted to: {}", dest.display());
    Ok(dest.to_path_buf())
}

/// Extract `binary_name` from the zip at `archive_path` to `dest`
pub async fn extract_binary(
    archive_path: &Path,
    binary_name: &str,
    dest: &Path,
) -> Result<PathBuf> {
    // Zip scan and inflate are blocking
    let archive_path = archive_path.to_path_buf();
    let binary_name = binary_name.to_string();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || extract_binary_blocking(&archive_path, &binary_name, &dest))
        .await?
}
