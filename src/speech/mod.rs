//! Speech input and output
//!
//! This module provides:
//! - A FIFO playback queue drained by one background worker, with pause/stop
//! - Sentence-like segmentation of utterances
//! - Synthesis adapters (espeak-ng process, text-only transcript)
//! - Speech capture through an external recognizer

pub mod queue;
pub mod segment;
pub mod stt;
pub mod synth;

// Re-export commonly used types
pub use queue::{
    PlaybackOutcome, PlaybackState, SpeechConfig, SpeechEvent, SpeechQueue, SpeechRequest,
};
pub use segment::split_segments;
pub use stt::{CaptureError, CommandListener, Listener};
pub use synth::{EspeakSpeaker, Speaker, TranscriptSpeaker, VoiceSettings};
