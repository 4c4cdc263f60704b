//! Speech playback queue and its background worker
//!
//! Utterances are queued in FIFO order and spoken by a single worker thread,
//! one sentence-like segment at a time. Between segments the worker honors
//! pause and stop requests, so a stop takes effect after the segment that is
//! currently being synthesized.

use super::segment::split_segments;
use super::synth::Speaker;
use crate::{MurmurError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Timing for the playback worker
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// How long the worker waits for a request before re-checking shutdown
    pub poll_interval: Duration,

    /// Sleep between pause checks while paused
    pub pause_poll: Duration,

    /// Capacity of the event channel; events beyond it are dropped
    pub event_capacity: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            pause_poll: Duration::from_millis(100),
            event_capacity: 256,
        }
    }
}

impl SpeechConfig {
    /// Set the idle poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the pause poll interval
    pub fn with_pause_poll(mut self, interval: Duration) -> Self {
        self.pause_poll = interval;
        self
    }
}

/// Flags shared between the foreground and the playback worker.
///
/// `paused` only means something while `speaking` is set. Every call to
/// [`PlaybackState::request_stop`] advances `epoch`; requests queued under an
/// older epoch are never played.
#[derive(Debug, Default)]
pub struct PlaybackState {
    speaking: AtomicBool,
    paused: AtomicBool,
    stop_requested: AtomicBool,
    epoch: AtomicU64,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Flip `paused` while speaking. Returns whether playback is now paused.
    pub fn toggle_pause(&self) -> bool {
        if !self.is_speaking() {
            return self.is_paused();
        }
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    /// Raise the stop flag, clear pause and start a new epoch
    pub fn request_stop(&self) -> u64 {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn begin(&self) {
        // A toggle racing the previous `end` may have left `paused` set
        self.paused.store(false, Ordering::SeqCst);
        self.speaking.store(true, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    fn end(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }
}

/// One utterance waiting for playback
#[derive(Clone, Debug)]
pub struct SpeechRequest {
    pub id: Uuid,
    pub text: String,
    epoch: u64,
}

/// How a request left the worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every segment was spoken
    Completed,

    /// A stop cut the request short
    Stopped,

    /// Synthesis failed; remaining segments were skipped
    Failed(String),
}

/// Notification emitted by the playback worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeechEvent {
    /// The worker started speaking a request
    Started { id: Uuid },

    /// The worker is done with a request
    Finished { id: Uuid, outcome: PlaybackOutcome },

    /// The request was dropped by a stop before it started
    Discarded { id: Uuid },

    /// The worker has exited
    Shutdown,
}

enum SpeechCommand {
    Speak(SpeechRequest),
    Shutdown,
}

/// FIFO of utterances drained by one background worker
pub struct SpeechQueue {
    config: SpeechConfig,
    state: Arc<PlaybackState>,
    speaker: Arc<dyn Speaker>,
    command_tx: Sender<SpeechCommand>,
    command_rx: Receiver<SpeechCommand>,
    event_tx: Sender<SpeechEvent>,
    event_rx: Receiver<SpeechEvent>,
    pending: Arc<AtomicUsize>,
    started: AtomicBool,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    /// Create a queue with its own playback state. The worker is not started.
    pub fn new(speaker: Arc<dyn Speaker>, config: SpeechConfig) -> Self {
        Self::with_state(speaker, Arc::new(PlaybackState::new()), config)
    }

    /// Create a queue around an externally owned playback state
    pub fn with_state(
        speaker: Arc<dyn Speaker>,
        state: Arc<PlaybackState>,
        config: SpeechConfig,
    ) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = bounded(config.event_capacity);

        Self {
            config,
            state,
            speaker,
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            pending: Arc::new(AtomicUsize::new(0)),
            started: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Start the worker thread. Safe to call repeatedly; at most one worker runs.
    pub fn start(&self) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(MurmurError::ChannelError("speech queue has shut down".into()));
        }

        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let worker = SpeechWorker {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            speaker: Arc::clone(&self.speaker),
            command_rx: self.command_rx.clone(),
            event_tx: self.event_tx.clone(),
            pending: Arc::clone(&self.pending),
            shutdown: Arc::clone(&self.shutdown),
        };

        let handle = thread::Builder::new()
            .name("speech-worker".into())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.started.store(false, Ordering::SeqCst);
                MurmurError::ChannelError(format!("failed to spawn speech worker: {}", e))
            })?;

        *self.worker.lock() = Some(handle);
        info!("Speech worker started");
        Ok(())
    }

    /// Queue `text` for playback without blocking, starting the worker if needed
    pub fn enqueue(&self, text: impl Into<String>) -> Result<Uuid> {
        self.start()?;

        let request = SpeechRequest {
            id: Uuid::new_v4(),
            text: text.into(),
            epoch: self.state.epoch(),
        };
        let id = request.id;

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.command_tx.send(SpeechCommand::Speak(request)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(MurmurError::ChannelError("speech queue is closed".into()));
        }

        debug!("Queued speech request {}", id);
        Ok(id)
    }

    /// Pause or resume the utterance being spoken. No effect when idle.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.state.toggle_pause();
        if self.state.is_speaking() {
            info!("Speech {}", if paused { "paused" } else { "resumed" });
        }
        paused
    }

    /// Abort the current utterance and discard everything still queued
    pub fn stop(&self) {
        let epoch = self.state.request_stop();

        let mut drained = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            if let SpeechCommand::Speak(request) = command {
                discard(request, &self.pending, &self.event_tx);
                drained += 1;
            }
        }

        info!("Speech stopped (epoch {}, {} queued requests discarded)", epoch, drained);
    }

    /// Stop playback and terminate the worker. Further enqueues fail.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop();
        let _ = self.command_tx.send(SpeechCommand::Shutdown);

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Speech worker panicked");
            }
        }
        info!("Speech queue shut down");
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.state.is_speaking()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shutdown.load(Ordering::SeqCst)
    }

    /// Requests queued or in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Receiver for worker events
    pub fn events(&self) -> Receiver<SpeechEvent> {
        self.event_rx.clone()
    }

    /// Block until nothing is queued or playing, or `timeout` elapses
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending() == 0 && !self.is_speaking() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn discard(request: SpeechRequest, pending: &AtomicUsize, event_tx: &Sender<SpeechEvent>) {
    debug!("Discarding speech request {}", request.id);
    pending.fetch_sub(1, Ordering::SeqCst);
    let _ = event_tx.try_send(SpeechEvent::Discarded { id: request.id });
}

struct SpeechWorker {
    config: SpeechConfig,
    state: Arc<PlaybackState>,
    speaker: Arc<dyn Speaker>,
    command_rx: Receiver<SpeechCommand>,
    event_tx: Sender<SpeechEvent>,
    pending: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl SpeechWorker {
    fn run(self) {
        debug!("Speech worker loop running");

        loop {
            match self.command_rx.recv_timeout(self.config.poll_interval) {
                Ok(SpeechCommand::Speak(request)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        discard(request, &self.pending, &self.event_tx);
                        self.drain();
                        break;
                    }
                    self.handle(request);
                }
                Ok(SpeechCommand::Shutdown) => {
                    self.drain();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Speech command channel disconnected");
                    break;
                }
            }
        }

        self.state.end();
        let _ = self.event_tx.try_send(SpeechEvent::Shutdown);
        info!("Speech worker stopped");
    }

    fn drain(&self) {
        while let Ok(command) = self.command_rx.try_recv() {
            if let SpeechCommand::Speak(request) = command {
                discard(request, &self.pending, &self.event_tx);
            }
        }
    }

    fn handle(&self, request: SpeechRequest) {
        if request.epoch != self.state.epoch() {
            discard(request, &self.pending, &self.event_tx);
            return;
        }

        self.state.begin();
        let _ = self.event_tx.try_send(SpeechEvent::Started { id: request.id });

        let outcome = self.play(&request);

        self.speaker.finish();
        self.state.end();
        self.pending.fetch_sub(1, Ordering::SeqCst);

        debug!("Speech request {} finished: {:?}", request.id, outcome);
        let _ = self.event_tx.try_send(SpeechEvent::Finished {
            id: request.id,
            outcome,
        });
    }

    fn play(&self, request: &SpeechRequest) -> PlaybackOutcome {
        for segment in split_segments(&request.text) {
            if self.stopped(request) {
                return PlaybackOutcome::Stopped;
            }

            while self.state.is_paused() {
                if self.stopped(request) {
                    return PlaybackOutcome::Stopped;
                }
                thread::sleep(self.config.pause_poll);
            }

            if self.stopped(request) {
                return PlaybackOutcome::Stopped;
            }

            if segment.trim().is_empty() {
                continue;
            }

            if let Err(e) = self.speaker.speak(&segment) {
                error!("Speech error: {}", e);
                return PlaybackOutcome::Failed(e.to_string());
            }
        }

        PlaybackOutcome::Completed
    }

    // The epoch check catches a stop that raced with `begin` clearing the flag
    fn stopped(&self, request: &SpeechRequest) -> bool {
        self.state.is_stop_requested() || self.state.epoch() != request.epoch
    }
}
