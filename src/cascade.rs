// Video rename cascade: move every "<old>.*" file to "<new>.*" as one
// journaled operation and rebuild the catalog entry

use std::fmt;
use std::path::PathBuf;
use serde::Serialize;

use crate::catalog::scan::scan_prefix;
use crate::catalog::Catalog;
use crate::error::{ReframeError, Result};
use crate::fsops::{path_occupied, FileMover, FsMover};
use crate::reframe::validate_name;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMove {
    pub planned: PlannedMove,
    pub error: String,
}

/// Record of a cascade: what was planned and where each file ended up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeJournal {
    pub old_base_name: String,
    pub new_base_name: String,
    pub planned: Vec<PlannedMove>,
    /// Moved and still under the new name.
    pub completed: Vec<PlannedMove>,
    /// Moved, then moved back after a later failure.
    pub rolled_back: Vec<PlannedMove>,
    /// The move that failed, and any failed reversals.
    pub failures: Vec<FailedMove>,
    /// Never attempted.
    pub pending: Vec<PlannedMove>,
    /// Set when the files moved but the catalog could not be rebuilt.
    pub catalog_error: Option<String>,
}

impl CascadeJournal {
    fn new(old_base_name: &str, new_base_name: &str, planned: Vec<PlannedMove>) -> Self {
        Self {
            old_base_name: old_base_name.to_string(),
            new_base_name: new_base_name.to_string(),
            planned,
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
            && self.catalog_error.is_none()
            && self.completed.len() == self.planned.len()
    }

    /// Files are split between the old and new prefix.
    pub fn is_split(&self) -> bool {
        !self.completed.is_empty() && self.completed.len() < self.planned.len()
    }
}

impl fmt::Display for CascadeJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rename of '{}' to '{}' incomplete: {} of {} files moved, {} moved back, {} not attempted",
            self.old_base_name,
            self.new_base_name,
            self.completed.len(),
            self.planned.len(),
            self.rolled_back.len(),
            self.pending.len()
        )?;
        for failure in &self.failures {
            write!(
                f,
                "; failed {} -> {}: {}",
                failure.planned.from.display(),
                failure.planned.to.display(),
                failure.error
            )?;
        }
        for mv in &self.completed {
            write!(f, "; now at {}", mv.to.display())?;
        }
        if let Some(ref error) = self.catalog_error {
            write!(f, "; catalog not refreshed: {}", error)?;
        }
        Ok(())
    }
}

/// Rename a video and all its companion files on the real filesystem.
pub fn rename_video(catalog: &mut Catalog, old_base_name: &str, new_base_name: &str) -> Result<CascadeJournal> {
    rename_video_with(catalog, old_base_name, new_base_name, &FsMover)
}

/// Rename through an explicit mover. On a failed move the completed moves
/// are reversed best-effort and the journal is returned inside
/// `CascadeIncomplete`. The catalog is rebuilt from disk either way.
pub fn rename_video_with(
    catalog: &mut Catalog,
    old_base_name: &str,
    new_base_name: &str,
    mover: &dyn FileMover,
) -> Result<CascadeJournal> {
    if !validate_name(new_base_name) {
        return Err(ReframeError::InvalidName(new_base_name.to_string()));
    }
    catalog.require_video(old_base_name)?;
    if catalog.contains(new_base_name) {
        return Err(ReframeError::FileAlreadyExists(catalog.directory().join(new_base_name)));
    }

    let planned = plan_moves(catalog, old_base_name, new_base_name)?;
    let mut journal = CascadeJournal::new(old_base_name, new_base_name, planned.clone());

    log::info!(
        "Renaming video '{}' to '{}' ({} files)",
        old_base_name,
        new_base_name,
        planned.len()
    );

    let mut remaining = planned.into_iter();
    while let Some(mv) = remaining.next() {
        match mover.move_file(&mv.from, &mv.to) {
            Ok(()) => journal.completed.push(mv),
            Err(e) => {
                log::warn!("Move {} -> {} failed: {}", mv.from.display(), mv.to.display(), e);
                journal.failures.push(FailedMove { planned: mv, error: e.to_string() });
                journal.pending = remaining.by_ref().collect();
                break;
            }
        }
    }

    if !journal.failures.is_empty() {
        roll_back(&mut journal, mover);
        reconcile(catalog, old_base_name, new_base_name);
        return Err(ReframeError::CascadeIncomplete(Box::new(journal)));
    }

    catalog.remove_video(old_base_name);
    if let Err(e) = catalog.rescan_prefix(new_base_name) {
        log::warn!("Files of '{}' moved but the catalog was not refreshed: {}", new_base_name, e);
        journal.catalog_error = Some(e.to_string());
        return Err(ReframeError::CascadeIncomplete(Box::new(journal)));
    }
    log::info!("Renamed video '{}' to '{}'", old_base_name, new_base_name);
    Ok(journal)
}

fn plan_moves(catalog: &Catalog, old_base_name: &str, new_base_name: &str) -> Result<Vec<PlannedMove>> {
    let directory = catalog.directory();
    let mut planned = Vec::new();

    for record in scan_prefix(directory, old_base_name)? {
        let suffix = &record.name[old_base_name.len()..];
        let to = directory.join(format!("{}{}", new_base_name, suffix));
        if path_occupied(&to) {
            return Err(ReframeError::FileAlreadyExists(to));
        }
        planned.push(PlannedMove { from: record.path, to });
    }

    Ok(planned)
}

fn roll_back(journal: &mut CascadeJournal, mover: &dyn FileMover) {
    let completed = std::mem::take(&mut journal.completed);

    for mv in completed.into_iter().rev() {
        match mover.move_file(&mv.to, &mv.from) {
            Ok(()) => journal.rolled_back.push(mv),
            Err(e) => {
                log::warn!(
                    "Could not move {} back to {}: {}",
                    mv.to.display(),
                    mv.from.display(),
                    e
                );
                journal.failures.push(FailedMove {
                    planned: PlannedMove { from: mv.to.clone(), to: mv.from.clone() },
                    error: e.to_string(),
                });
                journal.completed.push(mv);
            }
        }
    }
    journal.completed.reverse();
}

fn reconcile(catalog: &mut Catalog, old_base_name: &str, new_base_name: &str) {
    for base_name in [old_base_name, new_base_name] {
        if let Err(e) = catalog.rescan_prefix(base_name) {
            log::warn!("Could not rescan '{}' after failed rename: {}", base_name, e);
        }
    }
}
