// File move and verified copy primitives

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::constants::TEMP_FILE_PREFIX;
use crate::error::{IoContext, ReframeError, Result};
use crate::hash::{compute_full_hash, compute_full_hash_from_bytes, verify_hash};

/// Something that can move a file from one path to another.
pub trait FileMover {
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Moves on the real filesystem via [`move_file`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMover;

impl FileMover for FsMover {
    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        move_file(from, to)
    }
}

/// True if anything (file, dir, dangling link) sits at `path`.
pub fn path_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move `from` to `to` without ever replacing an existing destination.
/// Same-volume moves are a single rename; cross-volume moves fall back to
/// copy, verify, then delete the source.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    move_file_with(from, to, |a, b| fs::rename(a, b))
}

fn move_file_with<R>(from: &Path, to: &Path, rename: R) -> Result<()>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    if !path_occupied(from) {
        return Err(ReframeError::FileMissing(from.display().to_string()));
    }
    if path_occupied(to) {
        return Err(ReframeError::FileAlreadyExists(to.to_path_buf()));
    }

    match rename(from, to) {
        Ok(()) => {
            log::debug!("Moved {} -> {}", from.display(), to.display());
            Ok(())
        }
        Err(e) if is_cross_device(&e) => {
            log::info!(
                "Cross-volume move {} -> {}, copying with verification",
                from.display(),
                to.display()
            );
            copy_file(from, to)?;
            fs::remove_file(from).at(from)
        }
        Err(e) => Err(ReframeError::io(from, e)),
    }
}

/// Copy `from` to `to` through a temp file in the destination directory,
/// verifying the written bytes before the final rename. Modification time
/// is preserved. Never replaces an existing destination.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if path_occupied(to) {
        return Err(ReframeError::FileAlreadyExists(to.to_path_buf()));
    }

    let source_hash = compute_full_hash(from)?;
    let tmp_path = temp_path_for(to)?;

    if let Err(e) = fs::copy(from, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(ReframeError::io(from, e));
    }
    fs::File::open(&tmp_path)
        .and_then(|f| f.sync_all())
        .at(&tmp_path)?;

    if !verify_hash(&tmp_path, &source_hash)? {
        let _ = fs::remove_file(&tmp_path);
        return Err(ReframeError::VerificationFailed(format!(
            "copy of {} does not match its source",
            from.display()
        )));
    }

    if let Ok(modified) = fs::metadata(from).and_then(|m| m.modified()) {
        let _ = filetime::set_file_mtime(&tmp_path, filetime::FileTime::from_system_time(modified));
    }

    if let Err(e) = fs::rename(&tmp_path, to) {
        let _ = fs::remove_file(&tmp_path);
        return Err(ReframeError::io(to, e));
    }
    Ok(())
}

/// Write `bytes` to a new file at `path`, failing if it already exists.
/// The content is read back and compared before returning.
pub fn write_new_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ReframeError::FileAlreadyExists(path.to_path_buf()),
            _ => ReframeError::io(path, e),
        })?;

    let written = file.write_all(bytes).and_then(|_| file.sync_all());
    if let Err(e) = written {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(ReframeError::io(path, e));
    }

    if !verify_hash(path, &compute_full_hash_from_bytes(bytes))? {
        let _ = fs::remove_file(path);
        return Err(ReframeError::VerificationFailed(format!(
            "{} does not contain the bytes written",
            path.display()
        )));
    }
    Ok(())
}

// EXDEV on unix, ERROR_NOT_SAME_DEVICE on Windows
#[cfg(windows)]
const CROSS_DEVICE: i32 = 17;
#[cfg(not(windows))]
const CROSS_DEVICE: i32 = 18;

fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(CROSS_DEVICE)
}

fn temp_path_for(dest: &Path) -> Result<PathBuf> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ReframeError::InvalidName(dest.display().to_string()))?;
    Ok(parent.join(format!("{}{}", TEMP_FILE_PREFIX, name)))
}
