//! Opening URLs in the user's browser

use crate::{MurmurError, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Launches URLs; a pure side effect
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Uses the platform's URL opener
#[derive(Debug, Default, Clone)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        info!("Opening {}", url);
        launch(Self::command(url), url)
    }
}

/// Run the opener to completion. Openers hand the URL off and exit promptly.
fn launch(mut command: Command, url: &str) -> Result<()> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| MurmurError::IOError(format!("failed to open {}: {}", url, e)))?;

    if !status.success() {
        return Err(MurmurError::IOError(format!(
            "opener for {} exited with {}",
            url, status
        )));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_launch_waits_for_opener_exit() {
        for _ in 0..5 {
            assert!(launch(Command::new("true"), "https://google.com").is_ok());
        }
        assert_eq!(exited_unreaped_children("true"), 0);
    }

    /// Children of this process named `name` that exited but were never waited on
    #[cfg(target_os = "linux")]
    fn exited_unreaped_children(name: &str) -> usize {
        let me = std::process::id().to_string();
        let suffix = format!(" ({}", name);
        std::fs::read_dir("/proc")
            .unwrap()
            .filter_map(|entry| std::fs::read_to_string(entry.ok()?.path().join("stat")).ok())
            .filter(|stat| {
                // "<pid> (<comm>) <state> <ppid> ..."
                let Some((head, rest)) = stat.rsplit_once(") ") else {
                    return false;
                };
                let mut fields = rest.split_whitespace();
                head.ends_with(&suffix)
                    && fields.next() == Some("Z")
                    && fields.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(not(target_os = "linux"))]
    fn exited_unreaped_children(_name: &str) -> usize {
        0
    }

    #[test]
    fn test_launch_reports_failed_opener() {
        let err = launch(Command::new("false"), "https://google.com").unwrap_err();
        assert!(matches!(err, MurmurError::IOError(ref msg) if msg.contains("exited with")));
    }

    #[test]
    fn test_launch_missing_opener_is_io_error() {
        let err = launch(Command::new("no-such-url-opener-binary"), "https://google.com").unwrap_err();
        assert!(matches!(err, MurmurError::IOError(ref msg) if msg.contains("failed to open")));
    }
}
