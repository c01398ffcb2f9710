// Edit handoff: stage a reframe into the Player's slot, wait for the user,
// then bring it back into the working directory.
//
// Idle -> Staged -> AwaitingConfirmation -> Committing -> Done
//                                        \-> Idle (cancel, file stays staged)
// Staged -> Aborted (unstage)
// Committing -> Aborted (commit failure, no rollback)

pub mod launcher;
pub mod slot;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::scan::stat_file;
use crate::catalog::{Catalog, ReframeRecord, VideoQuality};
use crate::constants::DEFAULT_REFRAME_NAME;
use crate::error::{ReframeError, Result};
use crate::fsops::{move_file, path_occupied, write_new_file};
use crate::reframe::{new_automatic_path, template::REFRAME_TEMPLATE};
pub use launcher::{EditorLauncher, SystemLauncher};
pub use slot::{backup_path_for, find_staged_files, slot_file_name, slot_file_name_for, StagedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HandoffState {
    Idle,
    Staged,
    AwaitingConfirmation,
    Committing,
    Done,
    Aborted,
}

/// One stage/edit/commit round trip for one video.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffSession {
    pub id: String,
    pub base_name: String,
    pub quality: VideoQuality,
    /// Video the editor is launched against.
    pub video_path: PathBuf,
    /// The Player's working slot.
    pub slot_path: PathBuf,
    /// Set when a previous slot occupant was moved aside.
    pub backup_path: Option<PathBuf>,
    /// Where the reframe returns on commit.
    pub working_path: PathBuf,
    /// Reframe chosen by the user; `None` when one was synthesized.
    pub selected_reframe: Option<String>,
    state: HandoffState,
}

impl HandoffSession {
    /// Phase 1: move the chosen reframe (or a fresh automatic one) into the
    /// editor's slot, moving any previous occupant aside first.
    pub fn stage(
        catalog: &Catalog,
        editor_dir: &Path,
        base_name: &str,
        quality: VideoQuality,
        selected_reframe: Option<&str>,
    ) -> Result<Self> {
        if !catalog.directory().is_dir() {
            return Err(ReframeError::DirectoryNotFound(catalog.directory().display().to_string()));
        }
        if !editor_dir.is_dir() {
            return Err(ReframeError::DirectoryNotFound(editor_dir.display().to_string()));
        }

        let video = catalog.require_video(base_name)?;
        let video_file = video.video_file(quality).ok_or_else(|| {
            ReframeError::FileMissing(format!("{:?} definition video of '{}'", quality, base_name))
        })?;
        if !video_file.path.is_file() {
            return Err(ReframeError::FileMissing(video_file.path.display().to_string()));
        }

        let slot_path = editor_dir.join(slot_file_name_for(video_file));
        let backup_path = backup_path_for(&slot_path);

        let working_path = match selected_reframe {
            Some(name) => {
                let record = video.reframe(name).ok_or_else(|| {
                    ReframeError::FileMissing(format!("reframe '{}' of '{}'", name, base_name))
                })?;
                if !record.path().is_file() {
                    return Err(ReframeError::FileMissing(record.path().display().to_string()));
                }
                record.path().to_path_buf()
            }
            None => new_automatic_path(catalog, base_name, DEFAULT_REFRAME_NAME)?,
        };

        let needs_backup = path_occupied(&slot_path);
        if needs_backup && path_occupied(&backup_path) {
            return Err(ReframeError::FileAlreadyExists(backup_path));
        }

        let mut session = Self {
            id: Uuid::new_v4().to_string(),
            base_name: base_name.to_string(),
            quality,
            video_path: video_file.path.clone(),
            slot_path,
            backup_path: None,
            working_path,
            selected_reframe: selected_reframe.map(str::to_string),
            state: HandoffState::Idle,
        };

        if needs_backup {
            move_file(&session.slot_path, &backup_path)?;
            log::info!("[{}] Moved previous slot file aside to {}", session.id, backup_path.display());
            session.backup_path = Some(backup_path);
        }

        if let Err(e) = session.fill_slot() {
            session.restore_backup_best_effort();
            return Err(e);
        }

        session.state = HandoffState::Staged;
        log::info!(
            "[{}] Staged {} as {}",
            session.id,
            session.working_path.display(),
            session.slot_path.display()
        );
        Ok(session)
    }

    fn fill_slot(&self) -> Result<()> {
        if self.selected_reframe.is_some() {
            return move_file(&self.working_path, &self.slot_path);
        }

        write_new_file(&self.working_path, &REFRAME_TEMPLATE)?;
        if let Err(e) = move_file(&self.working_path, &self.slot_path) {
            let _ = fs::remove_file(&self.working_path);
            return Err(e);
        }
        Ok(())
    }

    fn restore_backup_best_effort(&self) {
        if let Some(ref backup) = self.backup_path {
            if let Err(e) = move_file(backup, &self.slot_path) {
                log::warn!(
                    "[{}] Could not restore {} to {}: {}",
                    self.id,
                    backup.display(),
                    self.slot_path.display(),
                    e
                );
            }
        }
    }

    pub fn state(&self) -> HandoffState {
        self.state
    }

    /// Still holds the slot (not yet committed, aborted or cancelled).
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            HandoffState::Staged | HandoffState::AwaitingConfirmation | HandoffState::Committing
        )
    }

    fn expect_state(&self, expected: HandoffState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(ReframeError::InvalidState(format!(
                "cannot {} '{}' while {:?}",
                action, self.base_name, self.state
            )));
        }
        Ok(())
    }

    /// Phase 2 entry: ask for the editor to be opened on the video. On
    /// failure the session stays staged.
    pub fn launch(&mut self, launcher: &dyn EditorLauncher) -> Result<()> {
        self.expect_state(HandoffState::Staged, "launch editor for")?;
        launcher.launch(&self.video_path)?;
        self.state = HandoffState::AwaitingConfirmation;
        log::info!("[{}] Editor launched, awaiting confirmation", self.id);
        Ok(())
    }

    /// Leave the confirmation wait without touching any file. The reframe
    /// stays in the slot.
    pub fn cancel(&mut self) -> Result<()> {
        self.expect_state(HandoffState::AwaitingConfirmation, "cancel")?;
        self.state = HandoffState::Idle;
        log::warn!(
            "[{}] Edit cancelled; {} left in place",
            self.id,
            self.slot_path.display()
        );
        Ok(())
    }

    /// Phase 3: move the slot file back under its working name, put any
    /// backed-up slot file back, then update the catalog. Failures are not
    /// rolled back; a failed move is reported with both of its paths.
    pub fn commit(&mut self, catalog: &mut Catalog) -> Result<ReframeRecord> {
        self.expect_state(HandoffState::AwaitingConfirmation, "commit")?;
        self.state = HandoffState::Committing;

        let slot = self.slot_path.clone();
        let working = self.working_path.clone();

        if let Err(e) = move_file(&slot, &working) {
            return Err(self.fail_commit(&slot, &working, e));
        }

        if let Some(backup) = self.backup_path.clone() {
            if let Err(e) = move_file(&backup, &slot) {
                return Err(self.fail_commit(&backup, &slot, e));
            }
            log::info!("[{}] Restored previous slot file", self.id);
        }

        let record = match self.update_catalog(catalog) {
            Ok(record) => record,
            Err(e) => {
                // Files are back in place; only the catalog is stale
                self.state = HandoffState::Aborted;
                log::warn!(
                    "[{}] {} returned but the catalog was not updated: {}",
                    self.id,
                    working.display(),
                    e
                );
                return Err(e);
            }
        };

        self.state = HandoffState::Done;
        log::info!("[{}] Committed {}", self.id, self.working_path.display());
        Ok(record)
    }

    fn fail_commit(&mut self, from: &Path, to: &Path, source: ReframeError) -> ReframeError {
        self.state = HandoffState::Aborted;
        log::warn!(
            "[{}] Commit failed moving {} -> {}: {}",
            self.id,
            from.display(),
            to.display(),
            source
        );
        ReframeError::HandoffCommit {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: Box::new(source),
        }
    }

    fn update_catalog(&self, catalog: &mut Catalog) -> Result<ReframeRecord> {
        let file = stat_file(&self.working_path)?;
        let record = ReframeRecord::new(file.clone());

        let existing = self.selected_reframe.as_deref().and_then(|name| {
            catalog.video(&self.base_name).and_then(|v| v.reframe_index(name))
        });

        match existing {
            Some(index) => catalog.replace_reframe(&self.base_name, index, record.clone())?,
            None => {
                catalog.insert_record(file)?;
            }
        }
        Ok(record)
    }

    /// Undo phase 1 before the editor ran: the reframe goes back (a
    /// synthesized one is discarded) and the backup is restored.
    pub fn unstage(&mut self) -> Result<()> {
        self.expect_state(HandoffState::Staged, "unstage")?;

        if self.selected_reframe.is_some() {
            move_file(&self.slot_path, &self.working_path)?;
        } else {
            fs::remove_file(&self.slot_path).map_err(|e| ReframeError::io(&self.slot_path, e))?;
        }

        if let Some(backup) = self.backup_path.clone() {
            move_file(&backup, &self.slot_path)?;
        }

        self.state = HandoffState::Aborted;
        log::info!("[{}] Unstaged", self.id);
        Ok(())
    }
}

/// Runs handoff sessions for one editor directory, at most one per video.
pub struct EditHandoffCoordinator<L: EditorLauncher> {
    editor_dir: PathBuf,
    launcher: L,
    sessions: HashMap<String, HandoffSession>,
}

impl<L: EditorLauncher> EditHandoffCoordinator<L> {
    pub fn new(editor_dir: impl Into<PathBuf>, launcher: L) -> Self {
        Self {
            editor_dir: editor_dir.into(),
            launcher,
            sessions: HashMap::new(),
        }
    }

    pub fn editor_dir(&self) -> &Path {
        &self.editor_dir
    }

    pub fn session(&self, base_name: &str) -> Option<&HandoffSession> {
        self.sessions.get(base_name)
    }

    /// Stage and launch. Returns once the session awaits confirmation.
    /// When the launch fails the staging is undone.
    pub fn begin(
        &mut self,
        catalog: &Catalog,
        base_name: &str,
        quality: VideoQuality,
        selected_reframe: Option<&str>,
    ) -> Result<&HandoffSession> {
        if self.sessions.get(base_name).is_some_and(|s| s.is_active()) {
            return Err(ReframeError::InvalidState(format!(
                "an edit of '{}' is already in progress",
                base_name
            )));
        }

        let mut session = HandoffSession::stage(catalog, &self.editor_dir, base_name, quality, selected_reframe)?;

        if let Err(launch_err) = session.launch(&self.launcher) {
            if let Err(e) = session.unstage() {
                log::warn!("[{}] Could not undo staging after failed launch: {}", session.id, e);
                self.sessions.insert(base_name.to_string(), session);
            }
            return Err(launch_err);
        }

        self.sessions.insert(base_name.to_string(), session);
        self.sessions
            .get(base_name)
            .ok_or_else(|| ReframeError::InvalidState(format!("no edit of '{}'", base_name)))
    }

    /// The user confirmed the editor has exited.
    pub fn confirm(&mut self, catalog: &mut Catalog, base_name: &str) -> Result<ReframeRecord> {
        let mut session = self.take_session(base_name)?;
        let result = session.commit(catalog);
        if result.is_err() {
            // Keep the failed session around so the host can show its paths
            self.sessions.insert(base_name.to_string(), session);
        }
        result
    }

    /// The user gave up waiting. The staged file stays in the slot.
    pub fn cancel(&mut self, base_name: &str) -> Result<HandoffSession> {
        let mut session = self.take_session(base_name)?;
        if let Err(e) = session.cancel() {
            self.sessions.insert(base_name.to_string(), session);
            return Err(e);
        }
        Ok(session)
    }

    /// Undo a session left staged by a failed launch.
    pub fn abort(&mut self, base_name: &str) -> Result<()> {
        let mut session = self.take_session(base_name)?;
        if let Err(e) = session.unstage() {
            self.sessions.insert(base_name.to_string(), session);
            return Err(e);
        }
        Ok(())
    }

    fn take_session(&mut self, base_name: &str) -> Result<HandoffSession> {
        self.sessions
            .remove(base_name)
            .ok_or_else(|| ReframeError::InvalidState(format!("no edit of '{}' in progress", base_name)))
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
