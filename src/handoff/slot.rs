// Player staging slot naming and leftover detection

use std::fmt::Display;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local, TimeZone};
use regex::Regex;
use serde::Serialize;

use crate::catalog::FileRecord;
use crate::constants::{EXT_BACKUP, EXT_REFRAME, SLOT_NAME_PATTERN, SLOT_TIMESTAMP_FORMAT};
use crate::error::{IoContext, ReframeError, Result};

/// "<yyyy-MM-dd-HH-mm-ss-000+hhmm>-<size>.reframe"
pub fn slot_file_name<Tz: TimeZone>(created: &DateTime<Tz>, size: u64) -> String
where
    Tz::Offset: Display,
{
    format!("{}-{}.{}", created.format(SLOT_TIMESTAMP_FORMAT), size, EXT_REFRAME)
}

/// Slot name for a video file, using the local time zone like the Player does.
pub fn slot_file_name_for(video: &FileRecord) -> String {
    slot_file_name(&video.created.with_timezone(&Local), video.size)
}

/// "<slot>.BACKUP"
pub fn backup_path_for(slot: &Path) -> PathBuf {
    let mut name = slot.as_os_str().to_os_string();
    name.push(".");
    name.push(EXT_BACKUP);
    PathBuf::from(name)
}

/// A slot or backup file found in the editor directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub path: PathBuf,
    pub timestamp: String,
    pub size: u64,
    pub is_backup: bool,
}

/// List slot files (and their backups) sitting in the editor directory.
pub fn find_staged_files(editor_dir: &Path) -> Result<Vec<StagedFile>> {
    if !editor_dir.is_dir() {
        return Err(ReframeError::DirectoryNotFound(editor_dir.display().to_string()));
    }

    let pattern = Regex::new(SLOT_NAME_PATTERN)?;
    let mut staged = Vec::new();

    for entry in std::fs::read_dir(editor_dir).at(editor_dir)? {
        let entry = entry.at(editor_dir)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(caps) = pattern.captures(name) else { continue };

        let size = match caps[2].parse::<u64>() {
            Ok(s) => s,
            Err(_) => {
                log::debug!("Ignoring slot-like name with oversized size field: {}", name);
                continue;
            }
        };

        staged.push(StagedFile {
            path: entry.path(),
            timestamp: caps[1].to_string(),
            size,
            is_backup: caps.get(3).is_some(),
        });
    }

    staged.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(staged)
}
