//! Speech capture
//!
//! Recognition itself is delegated to an external recognizer. The assistant
//! only needs a [`Listener`] that turns one spoken phrase into lowercase text.

use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

/// Why a capture attempt produced no text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no speech detected")]
    NoSpeech,

    #[error("recognition service unavailable: {0}")]
    Unavailable(String),
}

impl CaptureError {
    /// Transient status shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::NoSpeech => "Sorry, I didn't catch that.",
            CaptureError::Unavailable(_) => "Speech recognition service is unavailable.",
        }
    }
}

/// Captures one utterance from live audio
pub trait Listener: Send {
    /// Block until a phrase is recognized, returning it lowercased
    fn listen(&self) -> std::result::Result<String, CaptureError>;
}

/// Runs a recognizer command through the platform shell and reads the
/// transcript from its standard output.
pub struct CommandListener {
    command: String,
}

impl CommandListener {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Listener for CommandListener {
    fn listen(&self) -> std::result::Result<String, CaptureError> {
        if self.command.trim().is_empty() {
            return Err(CaptureError::Unavailable("no recognizer command configured".into()));
        }

        info!("Listening...");
        let output = shell(&self.command)
            .output()
            .map_err(|e| CaptureError::Unavailable(format!("failed to run recognizer: {}", e)))?;

        if !output.status.success() {
            return Err(CaptureError::Unavailable(format!(
                "recognizer exited with {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string())
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_lowercase();
        if transcript.is_empty() {
            return Err(CaptureError::NoSpeech);
        }

        debug!("Heard: {}", transcript);
        Ok(transcript)
    }
}

/// The platform shell running `command`: `sh -c` on Unix, `cmd /C` on Windows
fn shell(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", command]);
        cmd
    }
}
