//! Integration tests for the speech playback queue
//!
//! A recording speaker stands in for the synthesizer so the tests can observe
//! which segments were spoken and in what order.

use murmur::speech::{PlaybackOutcome, Speaker, SpeechConfig, SpeechEvent, SpeechQueue};
use murmur::{MurmurError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Records every segment it is asked to speak
struct RecordingSpeaker {
    spoken: Mutex<Vec<String>>,
    delay: Duration,
}

impl RecordingSpeaker {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, segment: &str) -> Result<()> {
        self.spoken.lock().push(segment.trim().to_string());
        if segment.contains("bad") {
            return Err(MurmurError::SynthesisError("voice unavailable".into()));
        }
        std::thread::sleep(self.delay);
        Ok(())
    }
}

fn fast_config() -> SpeechConfig {
    SpeechConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_pause_poll(Duration::from_millis(5))
}

fn queue_with(speaker: Arc<RecordingSpeaker>) -> SpeechQueue {
    SpeechQueue::new(speaker, fast_config())
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[test]
fn test_requests_play_in_fifo_order() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("first.").unwrap();
    queue.enqueue("second.").unwrap();
    queue.enqueue("third.").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["first.", "second.", "third."]);
    assert_eq!(queue.pending(), 0);
    assert!(!queue.is_speaking());
}

#[test]
fn test_segments_are_spoken_one_by_one() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("Hello there. How are you? Great!").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["Hello there.", "How are you?", "Great!"]);
}

#[test]
fn test_enqueue_starts_worker_lazily() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(speaker);

    assert!(!queue.is_running());
    queue.enqueue("Hi.").unwrap();
    assert!(queue.is_running());

    // A second start is a no-op
    queue.start().unwrap();
    assert!(queue.wait_idle(Duration::from_secs(5)));
}

#[test]
fn test_stop_while_speaking_discards_everything() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(80));
    let queue = queue_with(Arc::clone(&speaker));
    let events = queue.events();

    let first = queue.enqueue("One. Two. Three. Four. Five.").unwrap();
    let second = queue.enqueue("Never spoken.").unwrap();

    assert!(wait_until(Duration::from_secs(5), || queue.is_speaking()));
    queue.stop();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    let spoken_after_stop = speaker.spoken();
    std::thread::sleep(Duration::from_millis(200));

    // Only the in-flight segment may finish after the stop
    assert_eq!(speaker.spoken(), spoken_after_stop);
    assert!(spoken_after_stop.len() < 5);
    assert!(!spoken_after_stop.contains(&"Never spoken.".to_string()));
    assert!(!queue.is_speaking());
    assert!(!queue.is_paused());
    assert_eq!(queue.pending(), 0);

    let received: Vec<SpeechEvent> = events.try_iter().collect();
    assert!(received.contains(&SpeechEvent::Discarded { id: second }));
    assert!(received.contains(&SpeechEvent::Finished {
        id: first,
        outcome: PlaybackOutcome::Stopped,
    }));
}

#[test]
fn test_request_after_stop_plays() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(Arc::clone(&speaker));

    queue.stop();
    queue.enqueue("Still here.").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["Still here."]);
}

#[test]
fn test_request_after_stop_while_speaking_plays() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(50));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("Alpha. Beta. Gamma. Delta.").unwrap();
    assert!(wait_until(Duration::from_secs(5), || queue.is_speaking()));
    queue.stop();
    queue.enqueue("Fresh start.").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken().last().map(String::as_str), Some("Fresh start."));
}

#[test]
fn test_pause_holds_between_segments_and_resume_continues() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(40));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("A. B. C.").unwrap();
    assert!(wait_until(Duration::from_secs(5), || queue.is_speaking()));

    assert!(queue.toggle_pause());
    assert!(queue.is_paused());

    std::thread::sleep(Duration::from_millis(150));
    let while_paused = speaker.spoken().len();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(speaker.spoken().len(), while_paused);
    assert!(queue.is_speaking());

    assert!(!queue.toggle_pause());
    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["A.", "B.", "C."]);
}

#[test]
fn test_toggle_pause_while_idle_is_noop() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(speaker);

    assert!(!queue.toggle_pause());
    assert!(!queue.is_paused());
}

#[test]
fn test_stop_while_paused_clears_pause() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(30));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("One. Two. Three.").unwrap();
    assert!(wait_until(Duration::from_secs(5), || queue.is_speaking()));
    queue.toggle_pause();
    queue.stop();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert!(!queue.is_paused());
    assert!(speaker.spoken().len() < 3);
}

#[test]
fn test_synthesis_error_aborts_only_that_request() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(Arc::clone(&speaker));
    let events = queue.events();

    let failing = queue.enqueue("This is bad. Skipped.").unwrap();
    queue.enqueue("Recovered.").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["This is bad.", "Recovered."]);
    assert!(queue.is_running());

    let failed = events.try_iter().any(|event| {
        matches!(
            event,
            SpeechEvent::Finished { id, outcome: PlaybackOutcome::Failed(_) } if id == failing
        )
    });
    assert!(failed);
}

#[test]
fn test_blank_segments_are_skipped() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(Arc::clone(&speaker));

    queue.enqueue("Done. ").unwrap();
    queue.enqueue("   ").unwrap();

    assert!(queue.wait_idle(Duration::from_secs(5)));
    assert_eq!(speaker.spoken(), vec!["Done."]);
}

#[test]
fn test_shutdown_stops_worker_and_rejects_requests() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(1));
    let queue = queue_with(speaker);
    let events = queue.events();

    queue.enqueue("Goodbye.").unwrap();
    assert!(queue.wait_idle(Duration::from_secs(5)));

    queue.shutdown();
    assert!(!queue.is_running());
    assert!(queue.enqueue("Too late.").is_err());
    assert!(events.try_iter().any(|e| e == SpeechEvent::Shutdown));

    // Idempotent
    queue.shutdown();
}

#[test]
fn test_shutdown_mid_playback_drains_backlog() {
    let speaker = RecordingSpeaker::new(Duration::from_millis(40));
    let queue = queue_with(Arc::clone(&speaker));
    let events = queue.events();

    let ids: Vec<_> = (0..10)
        .map(|i| queue.enqueue(format!("r{i}. x{i}. y{i}.")).unwrap())
        .collect();
    assert!(wait_until(Duration::from_secs(5), || queue.is_speaking()));

    queue.shutdown();

    assert_eq!(queue.pending(), 0);
    assert!(!queue.is_speaking());
    assert!(!queue.is_running());

    let spoken = speaker.spoken();
    assert!(spoken.len() < 30);
    assert!(!spoken.contains(&"r9.".to_string()));

    let received: Vec<SpeechEvent> = events.try_iter().collect();
    for id in &ids[1..] {
        assert!(received.contains(&SpeechEvent::Discarded { id: *id }));
    }
    assert!(received.contains(&SpeechEvent::Shutdown));
}
