// Directory scanning: list and stat working-directory entries

use std::fs::{self, Metadata};
use std::path::Path;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{EntryType, FileKind, FileRecord};
use crate::error::{IoContext, ReframeError, Result};

/// List the top level of `directory` and return records of known kinds,
/// in enumeration order. Any listing or stat failure aborts the scan.
pub fn scan_directory(directory: &Path) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();

    for record in list_entries(directory)? {
        if record.entry_type == EntryType::Directory {
            continue;
        }
        if record.kind() == FileKind::Other || record.base_name().is_empty() {
            log::debug!("Skipping unrecognized entry '{}'", record.name);
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

/// All non-directory entries named `<base_name>.<anything>`, unfiltered.
pub fn scan_prefix(directory: &Path, base_name: &str) -> Result<Vec<FileRecord>> {
    let prefix = format!("{}.", base_name);
    Ok(list_entries(directory)?
        .into_iter()
        .filter(|r| r.entry_type != EntryType::Directory && r.name.starts_with(&prefix))
        .collect())
}

/// Stat a single file into a record.
pub fn stat_file(path: &Path) -> Result<FileRecord> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ReframeError::InvalidName(path.display().to_string()))?
        .to_string();

    stat_file_named(name, path)
}

fn list_entries(directory: &Path) -> Result<Vec<FileRecord>> {
    if !directory.is_dir() {
        return Err(ReframeError::DirectoryNotFound(directory.display().to_string()));
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(directory).to_path_buf();
            match e.into_io_error() {
                Some(io) => ReframeError::io(path, io),
                None => ReframeError::DirectoryNotFound(path.display().to_string()),
            }
        })?;

        let name = match entry.file_name().to_str() {
            Some(n) => n.to_string(),
            None => {
                log::debug!("Skipping non UTF-8 entry {}", entry.path().display());
                continue;
            }
        };

        records.push(stat_file_named(name, entry.path())?);
    }

    Ok(records)
}

fn stat_file_named(name: String, path: &Path) -> Result<FileRecord> {
    let link_meta = fs::symlink_metadata(path).at(path)?;
    let meta = if link_meta.file_type().is_symlink() {
        fs::metadata(path).at(path)?
    } else {
        link_meta.clone()
    };
    record_from_metadata(name, path, &link_meta, &meta)
}

fn record_from_metadata(name: String, path: &Path, link_meta: &Metadata, meta: &Metadata) -> Result<FileRecord> {
    let entry_type = if link_meta.file_type().is_symlink() {
        EntryType::Symlink
    } else if meta.is_dir() {
        EntryType::Directory
    } else if meta.is_file() {
        EntryType::File
    } else {
        EntryType::Other
    };

    let modified: DateTime<Utc> = meta.modified().at(path)?.into();
    // Birth time is not available on every filesystem
    let created: DateTime<Utc> = match meta.created() {
        Ok(t) => t.into(),
        Err(_) => modified,
    };

    Ok(FileRecord {
        name,
        path: path.to_path_buf(),
        size: meta.len(),
        created,
        modified,
        entry_type,
    })
}
