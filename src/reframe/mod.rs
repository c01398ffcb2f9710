// Reframe lifecycle: naming, create, copy, rename and delete of .reframe companions

pub mod template;

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::catalog::scan::stat_file;
use crate::catalog::{Catalog, ReframeRecord};
use crate::constants::{AUTO_NAME_CAP, EXT_REFRAME, FORBIDDEN_NAME_CHARS, MAX_NAME_LENGTH};
use crate::error::{ReframeError, Result};
use crate::fsops::{copy_file, move_file, path_occupied, write_new_file};
use template::REFRAME_TEMPLATE;

/// True if `name` can be used as a reframe (or video) name: non-empty,
/// at most 50 characters, none of `/ \ . @ " ' ~ | $ % * ?`.
pub fn validate_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().count() <= MAX_NAME_LENGTH
        && !name.chars().any(|c| FORBIDDEN_NAME_CHARS.contains(&c))
}

/// "<base_name>.<reframe_name>.reframe"
pub fn compose_file_name(base_name: &str, reframe_name: &str) -> String {
    format!("{}.{}.{}", base_name, reframe_name, EXT_REFRAME)
}

/// Path for a new reframe of `base_name`, checked against the catalog and
/// the disk. The disk check is advisory; the final write refuses to
/// overwrite regardless.
pub fn new_path(catalog: &Catalog, base_name: &str, reframe_name: &str) -> Result<PathBuf> {
    if !validate_name(reframe_name) {
        return Err(ReframeError::InvalidName(reframe_name.to_string()));
    }

    let video = catalog.require_video(base_name)?;
    let path = catalog
        .directory()
        .join(compose_file_name(base_name, reframe_name));

    if video.has_reframe(reframe_name) || path_occupied(&path) {
        return Err(ReframeError::FileAlreadyExists(path));
    }

    Ok(path)
}

/// First free "<prefix> <n>" path for n = 1, 2, ...
pub fn new_automatic_path(catalog: &Catalog, base_name: &str, prefix: &str) -> Result<PathBuf> {
    let mut last_taken = None;

    for n in 1..=AUTO_NAME_CAP {
        match new_path(catalog, base_name, &automatic_name(prefix, n)) {
            Ok(path) => return Ok(path),
            Err(ReframeError::FileAlreadyExists(path)) => last_taken = Some(path),
            Err(e) => return Err(e),
        }
    }

    log::warn!("No free automatic name for '{}' with prefix '{}'", base_name, prefix);
    Err(ReframeError::FileAlreadyExists(
        last_taken.unwrap_or_else(|| catalog.directory().to_path_buf()),
    ))
}

pub fn automatic_name(prefix: &str, n: u32) -> String {
    format!("{} {}", prefix, n)
}

/// Create a new reframe file holding the template payload.
pub fn create(catalog: &mut Catalog, base_name: &str, reframe_name: &str) -> Result<ReframeRecord> {
    let path = new_path(catalog, base_name, reframe_name)?;
    write_new_file(&path, &REFRAME_TEMPLATE)?;
    log::info!("Created reframe {}", path.display());
    insert_new(catalog, path)
}

/// Create a reframe under the first free automatic name.
pub fn create_automatic(catalog: &mut Catalog, base_name: &str, prefix: &str) -> Result<ReframeRecord> {
    let path = new_automatic_path(catalog, base_name, prefix)?;
    write_new_file(&path, &REFRAME_TEMPLATE)?;
    log::info!("Created reframe {}", path.display());
    insert_new(catalog, path)
}

/// Delete a reframe file. The record is dropped only after the file is gone;
/// a file already missing from disk is reported as `FileMissing`.
pub fn delete(catalog: &mut Catalog, base_name: &str, reframe_name: &str) -> Result<ReframeRecord> {
    let (index, record) = lookup(catalog, base_name, reframe_name)?;

    fs::remove_file(record.path()).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ReframeError::FileMissing(record.path().display().to_string()),
        _ => ReframeError::io(record.path(), e),
    })?;
    log::info!("Deleted reframe {}", record.path().display());

    catalog
        .remove_reframe(base_name, index)
        .ok_or_else(|| ReframeError::FileMissing(record.name().to_string()))
}

/// Copy a reframe under a new name. The source is left untouched.
pub fn copy(catalog: &mut Catalog, base_name: &str, reframe_name: &str, new_name: &str) -> Result<ReframeRecord> {
    let (_, source) = lookup(catalog, base_name, reframe_name)?;
    let dest = new_path(catalog, base_name, new_name)?;

    copy_file(source.path(), &dest)?;
    log::info!("Copied reframe {} -> {}", source.path().display(), dest.display());
    insert_new(catalog, dest)
}

/// Rename a reframe with a single move. The record keeps its list position.
pub fn rename(catalog: &mut Catalog, base_name: &str, reframe_name: &str, new_name: &str) -> Result<ReframeRecord> {
    let (index, source) = lookup(catalog, base_name, reframe_name)?;
    let dest = new_path(catalog, base_name, new_name)?;

    move_file(source.path(), &dest)?;
    log::info!("Renamed reframe {} -> {}", source.path().display(), dest.display());

    match stat_file(&dest) {
        Ok(file) => {
            let record = ReframeRecord::new(file);
            catalog.replace_reframe(base_name, index, record.clone())?;
            Ok(record)
        }
        Err(e) => {
            // The old record no longer points at a file
            catalog.remove_reframe(base_name, index);
            Err(e)
        }
    }
}

fn lookup(catalog: &Catalog, base_name: &str, reframe_name: &str) -> Result<(usize, ReframeRecord)> {
    let video = catalog.require_video(base_name)?;
    let index = video.reframe_index(reframe_name).ok_or_else(|| {
        ReframeError::FileMissing(compose_file_name(base_name, reframe_name))
    })?;
    Ok((index, video.reframes[index].clone()))
}

fn insert_new(catalog: &mut Catalog, path: PathBuf) -> Result<ReframeRecord> {
    let file = stat_file(&path)?;
    let record = ReframeRecord::new(file.clone());
    catalog.insert_record(file)?;
    Ok(record)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
