//! Speech synthesis adapters
//!
//! The playback worker drives a [`Speaker`] one segment at a time. Each call
//! blocks until the segment has been spoken, which is what lets pause and stop
//! take effect between sentences.

use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

/// Something that can vocalize text synchronously
pub trait Speaker: Send + Sync {
    /// Speak one segment, returning once it has finished
    fn speak(&self, segment: &str) -> Result<()>;

    /// Release per-request resources after the last segment of a request
    fn finish(&self) {}
}

/// Voice parameters for process-based synthesis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Synthesizer executable
    pub program: String,

    /// Voice name understood by the synthesizer (None = its default)
    pub voice: Option<String>,

    /// Speech rate in words per minute
    pub rate: u32,

    /// Volume from 0.0 to 1.0
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            voice: None,
            rate: 170,
            volume: 1.0,
        }
    }
}

impl VoiceSettings {
    /// Set the voice name
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the speech rate, clamped to 100..=250 words per minute
    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate.clamp(100, 250);
        self
    }

    /// Set the volume, clamped to 0.0..=1.0
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// espeak amplitude scale is 0-200
    fn amplitude(&self) -> u32 {
        (self.volume.clamp(0.0, 1.0) * 200.0).round() as u32
    }

    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = &self.voice {
            args.push("-v".to_string());
            args.push(voice.clone());
        }
        args.push("-s".to_string());
        args.push(self.rate.to_string());
        args.push("-a".to_string());
        args.push(self.amplitude().to_string());
        args.push("--stdin".to_string());
        args
    }
}

/// Speaks through an `espeak-ng` compatible process, one process per segment
pub struct EspeakSpeaker {
    settings: VoiceSettings,
}

impl EspeakSpeaker {
    pub fn new(settings: VoiceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }
}

impl Speaker for EspeakSpeaker {
    fn speak(&self, segment: &str) -> Result<()> {
        debug!("Speaking: {}", segment);

        let mut child = Command::new(&self.settings.program)
            .args(self.settings.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MurmurError::SynthesisError(format!(
                    "failed to start {}: {}",
                    self.settings.program, e
                ))
            })?;

        // stdin is dropped at the end of the match so the synthesizer sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(segment.as_bytes()),
            None => Ok(()),
        };
        if let Err(e) = written {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MurmurError::SynthesisError(format!("failed to send text: {}", e)));
        }

        let output = child
            .wait_with_output()
            .map_err(|e| MurmurError::SynthesisError(format!("synthesizer did not finish: {}", e)))?;

        if !output.status.success() {
            return Err(MurmurError::SynthesisError(format!(
                "{} exited with {}: {}",
                self.settings.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Text-only output: prints each segment instead of vocalizing it
pub struct TranscriptSpeaker {
    pace: Duration,
}

impl TranscriptSpeaker {
    pub fn new(pace: Duration) -> Self {
        Self { pace }
    }
}

impl Default for TranscriptSpeaker {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

impl Speaker for TranscriptSpeaker {
    fn speak(&self, segment: &str) -> Result<()> {
        println!("🔊 {}", segment.trim());
        std::thread::sleep(self.pace);
        Ok(())
    }
}
