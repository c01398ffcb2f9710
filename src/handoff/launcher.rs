// Launching the external Player app

use std::path::Path;
use std::process::Command;

use crate::error::{ReframeError, Result};

/// Opens a video in the external editor. Returning `Ok` only means the
/// launch request was accepted; the editor's lifetime is not observable.
pub trait EditorLauncher {
    fn launch(&self, video: &Path) -> Result<()>;
}

/// Launches through the platform opener, or an explicit command when set.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    command: Option<String>,
}

impl SystemLauncher {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }

    fn build_command(&self, video: &Path) -> Command {
        if let Some(ref program) = self.command {
            let mut cmd = Command::new(program);
            cmd.arg(video);
            return cmd;
        }

        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("open");
            cmd.arg(video);
            cmd
        }
        #[cfg(target_os = "windows")]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]).arg(video);
            cmd
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(video);
            cmd
        }
    }
}

impl EditorLauncher for SystemLauncher {
    fn launch(&self, video: &Path) -> Result<()> {
        let mut cmd = self.build_command(video);
        log::info!("Launching editor: {:?}", cmd);

        cmd.spawn()
            .map(|_| ())
            .map_err(|e| ReframeError::EditorLaunch(format!("{:?}: {}", cmd.get_program(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_command_is_used() {
        let launcher = SystemLauncher::new(Some("player-app".to_string()));
        let cmd = launcher.build_command(Path::new("/work/GOPR0001.360"));
        assert_eq!(cmd.get_program(), "player-app");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![std::ffi::OsStr::new("/work/GOPR0001.360")]);
    }

    #[test]
    fn test_missing_program_is_launch_failure() {
        let launcher = SystemLauncher::new(Some("/nonexistent/reframe-player-bin".to_string()));
        let err = launcher.launch(Path::new("/work/GOPR0001.360")).unwrap_err();
        assert!(matches!(err, ReframeError::EditorLaunch(_)));
    }
}
