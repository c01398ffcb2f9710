// Handoff protocol scenarios

use super::*;
use std::cell::RefCell;
use tempfile::TempDir;

/// Records launch requests instead of starting anything.
#[derive(Default)]
struct RecordingLauncher {
    launched: RefCell<Vec<PathBuf>>,
}

impl EditorLauncher for RecordingLauncher {
    fn launch(&self, video: &Path) -> Result<()> {
        self.launched.borrow_mut().push(video.to_path_buf());
        Ok(())
    }
}

struct FailingLauncher;

impl EditorLauncher for FailingLauncher {
    fn launch(&self, _video: &Path) -> Result<()> {
        Err(ReframeError::EditorLaunch("player not installed".to_string()))
    }
}

struct Fixture {
    _tmp: TempDir,
    work: PathBuf,
    player: PathBuf,
    catalog: Catalog,
}

fn setup(reframes: &[(&str, &[u8])]) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let work = tmp.path().join("work");
    let player = tmp.path().join("player");
    fs::create_dir_all(&work).unwrap();
    fs::create_dir_all(&player).unwrap();

    fs::write(work.join("GOPR0001.360"), b"high definition video").unwrap();
    fs::write(work.join("GOPR0001.LRV"), b"low def").unwrap();
    for (name, content) in reframes {
        fs::write(work.join(format!("GOPR0001.{}.reframe", name)), content).unwrap();
    }

    let catalog = Catalog::open(&work).unwrap();
    Fixture { _tmp: tmp, work, player, catalog }
}

fn expected_slot(fx: &Fixture, quality: VideoQuality) -> PathBuf {
    let video = fx.catalog.video("GOPR0001").unwrap().video_file(quality).unwrap();
    fx.player.join(slot_file_name_for(video))
}

#[test]
fn test_stage_moves_selected_reframe_into_slot() {
    let fx = setup(&[("Take 1", b"edit list")]);
    let slot = expected_slot(&fx, VideoQuality::High);

    let session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();

    assert_eq!(session.state(), HandoffState::Staged);
    assert_eq!(session.slot_path, slot);
    assert_eq!(fs::read(&slot).unwrap(), b"edit list");
    assert!(!fx.work.join("GOPR0001.Take 1.reframe").exists());
    assert!(session.backup_path.is_none());
}

#[test]
fn test_slot_name_uses_size_of_chosen_quality() {
    let fx = setup(&[]);
    let slot = expected_slot(&fx, VideoQuality::Low);
    let name = slot.file_name().unwrap().to_str().unwrap();
    assert!(name.ends_with("-7.reframe"), "unexpected slot name {}", name);
}

#[test]
fn test_full_round_trip_with_backup() {
    let mut fx = setup(&[("Take 1", b"v1")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    fs::write(&slot, b"player's own file").unwrap();

    let launcher = RecordingLauncher::default();
    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    let backup = session.backup_path.clone().unwrap();
    assert_eq!(fs::read(&backup).unwrap(), b"player's own file");
    assert_eq!(fs::read(&slot).unwrap(), b"v1");

    session.launch(&launcher).unwrap();
    assert_eq!(session.state(), HandoffState::AwaitingConfirmation);
    assert_eq!(launcher.launched.borrow().as_slice(), &[fx.work.join("GOPR0001.360")]);

    // The editor rewrites the slot file
    fs::write(&slot, b"v2 with keyframes").unwrap();

    let record = session.commit(&mut fx.catalog).unwrap();
    assert_eq!(session.state(), HandoffState::Done);
    assert_eq!(record.reframe_name(), "Take 1");
    assert_eq!(record.file.size, b"v2 with keyframes".len() as u64);
    assert_eq!(fs::read(fx.work.join("GOPR0001.Take 1.reframe")).unwrap(), b"v2 with keyframes");
    assert_eq!(fs::read(&slot).unwrap(), b"player's own file");
    assert!(!backup.exists());

    let video = fx.catalog.video("GOPR0001").unwrap();
    assert_eq!(video.reframes.len(), 1);
    assert_eq!(video.reframes[0].file.size, record.file.size);
}

#[test]
fn test_no_selection_synthesizes_automatic_reframe() {
    let mut fx = setup(&[("Unknown 1", b"x")]);
    let slot = expected_slot(&fx, VideoQuality::High);

    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, None).unwrap();
    assert_eq!(session.working_path, fx.work.join("GOPR0001.Unknown 2.reframe"));
    assert_eq!(fs::read(&slot).unwrap(), REFRAME_TEMPLATE);
    assert!(!session.working_path.exists());

    session.launch(&RecordingLauncher::default()).unwrap();
    let record = session.commit(&mut fx.catalog).unwrap();

    assert_eq!(record.reframe_name(), "Unknown 2");
    assert!(!slot.exists());
    let names: Vec<&str> = fx.catalog.video("GOPR0001").unwrap().reframes.iter().map(|r| r.reframe_name()).collect();
    assert_eq!(names, vec!["Unknown 1", "Unknown 2"]);
}

#[test]
fn test_cancel_leaves_file_staged() {
    let fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);

    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    session.launch(&RecordingLauncher::default()).unwrap();
    session.cancel().unwrap();

    assert_eq!(session.state(), HandoffState::Idle);
    assert!(slot.exists());
    assert!(!fx.work.join("GOPR0001.Take 1.reframe").exists());
}

#[test]
fn test_cancel_only_from_awaiting_confirmation() {
    let fx = setup(&[("Take 1", b"edit")]);
    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    let err = session.cancel().unwrap_err();
    assert!(matches!(err, ReframeError::InvalidState(_)));
    assert_eq!(session.state(), HandoffState::Staged);
}

#[test]
fn test_commit_requires_launch() {
    let mut fx = setup(&[("Take 1", b"edit")]);
    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    let err = session.commit(&mut fx.catalog).unwrap_err();
    assert!(matches!(err, ReframeError::InvalidState(_)));
}

#[test]
fn test_commit_failure_reports_paths() {
    let mut fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);

    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    session.launch(&RecordingLauncher::default()).unwrap();

    // Something else took the working name while the editor ran
    fs::write(fx.work.join("GOPR0001.Take 1.reframe"), b"intruder").unwrap();

    match session.commit(&mut fx.catalog) {
        Err(ReframeError::HandoffCommit { from, to, .. }) => {
            assert_eq!(from, slot);
            assert_eq!(to, fx.work.join("GOPR0001.Take 1.reframe"));
        }
        other => panic!("expected HandoffCommit, got {:?}", other),
    }
    assert_eq!(session.state(), HandoffState::Aborted);
    assert!(slot.exists());
    assert_eq!(fs::read(fx.work.join("GOPR0001.Take 1.reframe")).unwrap(), b"intruder");
}

#[test]
fn test_stage_errors() {
    let fx = setup(&[]);

    let err = HandoffSession::stage(&fx.catalog, &fx.work.join("missing"), "GOPR0001", VideoQuality::High, None).unwrap_err();
    assert!(matches!(err, ReframeError::DirectoryNotFound(_)));

    let err = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0002", VideoQuality::High, None).unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));

    let err = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Nope")).unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));

    fs::remove_file(fx.work.join("GOPR0001.360")).unwrap();
    let err = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, None).unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));
}

#[test]
fn test_stage_refuses_when_backup_already_present() {
    let fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    fs::write(&slot, b"staged earlier").unwrap();
    fs::write(backup_path_for(&slot), b"older backup").unwrap();

    let err = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap_err();
    assert!(matches!(err, ReframeError::FileAlreadyExists(_)));
    assert_eq!(fs::read(&slot).unwrap(), b"staged earlier");
    assert!(fx.work.join("GOPR0001.Take 1.reframe").exists());
}

#[test]
fn test_unstage_restores_everything() {
    let fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    fs::write(&slot, b"player's own file").unwrap();

    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    session.unstage().unwrap();

    assert_eq!(session.state(), HandoffState::Aborted);
    assert_eq!(fs::read(fx.work.join("GOPR0001.Take 1.reframe")).unwrap(), b"edit");
    assert_eq!(fs::read(&slot).unwrap(), b"player's own file");
}

#[test]
fn test_coordinator_one_session_per_video() {
    let mut fx = setup(&[("A", b"a"), ("B", b"b")]);
    let mut coordinator = EditHandoffCoordinator::new(&fx.player, RecordingLauncher::default());

    coordinator.begin(&fx.catalog, "GOPR0001", VideoQuality::High, Some("A")).unwrap();
    let err = coordinator.begin(&fx.catalog, "GOPR0001", VideoQuality::Low, Some("B")).unwrap_err();
    assert!(matches!(err, ReframeError::InvalidState(_)));

    let record = coordinator.confirm(&mut fx.catalog, "GOPR0001").unwrap();
    assert_eq!(record.reframe_name(), "A");
    assert!(coordinator.session("GOPR0001").is_none());

    coordinator.begin(&fx.catalog, "GOPR0001", VideoQuality::Low, Some("B")).unwrap();
    let cancelled = coordinator.cancel("GOPR0001").unwrap();
    assert_eq!(cancelled.state(), HandoffState::Idle);
    assert!(cancelled.slot_path.exists());
}

#[test]
fn test_coordinator_undoes_staging_when_launch_fails() {
    let fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    let mut coordinator = EditHandoffCoordinator::new(&fx.player, FailingLauncher);

    let err = coordinator.begin(&fx.catalog, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap_err();
    assert!(matches!(err, ReframeError::EditorLaunch(_)));
    assert!(!slot.exists());
    assert!(fx.work.join("GOPR0001.Take 1.reframe").exists());
    assert!(coordinator.session("GOPR0001").is_none());
}

#[test]
fn test_coordinator_confirm_without_session() {
    let mut fx = setup(&[]);
    let mut coordinator = EditHandoffCoordinator::new(&fx.player, RecordingLauncher::default());
    let err = coordinator.confirm(&mut fx.catalog, "GOPR0001").unwrap_err();
    assert!(matches!(err, ReframeError::InvalidState(_)));
}

/// Fails to launch after something claimed the reframe's working name.
struct BlockingLauncher {
    blocker: PathBuf,
}

impl EditorLauncher for BlockingLauncher {
    fn launch(&self, _video: &Path) -> Result<()> {
        fs::write(&self.blocker, b"placeholder").unwrap();
        Err(ReframeError::EditorLaunch("player crashed on start".to_string()))
    }
}

#[test]
fn test_coordinator_abort_retries_failed_undo() {
    let fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    let working = fx.work.join("GOPR0001.Take 1.reframe");
    let mut coordinator = EditHandoffCoordinator::new(&fx.player, BlockingLauncher { blocker: working.clone() });

    let err = coordinator.begin(&fx.catalog, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap_err();
    assert!(matches!(err, ReframeError::EditorLaunch(_)));

    // Undo could not put the reframe back, so the session is kept
    let session = coordinator.session("GOPR0001").unwrap();
    assert_eq!(session.state(), HandoffState::Staged);
    assert_eq!(fs::read(&slot).unwrap(), b"edit");

    fs::remove_file(&working).unwrap();
    coordinator.abort("GOPR0001").unwrap();

    assert!(coordinator.session("GOPR0001").is_none());
    assert!(!slot.exists());
    assert_eq!(fs::read(&working).unwrap(), b"edit");
}

#[cfg(unix)]
#[test]
fn test_catalog_failure_on_commit_still_restores_backup() {
    let mut fx = setup(&[("Take 1", b"edit")]);
    let slot = expected_slot(&fx, VideoQuality::High);
    fs::write(&slot, b"player's own file").unwrap();

    let mut session = HandoffSession::stage(&fx.catalog, &fx.player, "GOPR0001", VideoQuality::High, Some("Take 1")).unwrap();
    session.launch(&RecordingLauncher::default()).unwrap();

    // The editor leaves a link to a file that no longer exists
    fs::remove_file(&slot).unwrap();
    std::os::unix::fs::symlink(fx.player.join("deleted.reframe"), &slot).unwrap();

    let err = session.commit(&mut fx.catalog).unwrap_err();
    assert!(matches!(err, ReframeError::Io { .. }), "got {:?}", err);
    assert_eq!(session.state(), HandoffState::Aborted);
    assert_eq!(fs::read(&slot).unwrap(), b"player's own file");
    assert!(!backup_path_for(&slot).exists());
}
