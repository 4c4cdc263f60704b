//! Assistant composition root
//!
//! Owns the conversation, the speech queue and the command interpreter, and
//! exposes the operations the interactive front-end drives.

use super::config::AssistantConfig;
use crate::command::{CommandInterpreter, Services};
use crate::llm::{ChatSession, GeminiChat};
use crate::messages::{ConversationStore, Message, SessionId};
use crate::persistence::{SqliteTranscriptStore, TranscriptStore};
use crate::services::{
    ImageGenerator, StabilityImageGenerator, SystemBrowser, WikipediaLookup,
};
use crate::speech::{
    CaptureError, CommandListener, EspeakSpeaker, Listener, Speaker, SpeechQueue,
    TranscriptSpeaker,
};
use crate::Result;
use chrono::{Local, Timelike};
use std::sync::Arc;
use tracing::{info, warn};

const WELCOME: &str = "I'm your AI Assistant. Please tell me how I can help you.";

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantStatus {
    /// Speaking, but paused between sentences
    Paused,
    /// Speaking
    Speaking,
    /// Idle
    Ready,
}

impl AssistantStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AssistantStatus::Paused => "Paused",
            AssistantStatus::Speaking => "Speaking...",
            AssistantStatus::Ready => "Ready",
        }
    }
}

/// Time-of-day greeting for a 24-hour clock hour
pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good Morning!",
        12..=17 => "Good Afternoon!",
        _ => "Good Evening!",
    }
}

/// Everything the assistant talks to
pub struct Collaborators {
    pub speaker: Arc<dyn Speaker>,
    pub listener: Option<Box<dyn Listener>>,
    pub persistence: Option<Arc<dyn TranscriptStore>>,
    pub services: Services,
}

impl Collaborators {
    /// Build the real adapters described by `config`.
    ///
    /// Optional services that fail to initialize are disabled with a warning.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let speaker: Arc<dyn Speaker> = if config.text_only {
            Arc::new(TranscriptSpeaker::default())
        } else {
            Arc::new(EspeakSpeaker::new(config.voice.clone()))
        };

        let listener = config
            .capture
            .command
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| Box::new(CommandListener::new(c)) as Box<dyn Listener>);

        let persistence = config.persistence.database.as_ref().and_then(|path| {
            match SqliteTranscriptStore::open(path) {
                Ok(store) => Some(Arc::new(store) as Arc<dyn TranscriptStore>),
                Err(e) => {
                    warn!("Persistence disabled: {}", e);
                    None
                }
            }
        });

        let chat = if config.llm.key().is_some() {
            match GeminiChat::new(&config.llm) {
                Ok(chat) => Some(Box::new(chat) as Box<dyn ChatSession>),
                Err(e) => {
                    warn!("Chat model disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let images = if config.image.api_key.is_some() {
            match StabilityImageGenerator::new(config.image.clone()) {
                Ok(generator) => Some(Box::new(generator) as Box<dyn ImageGenerator>),
                Err(e) => {
                    warn!("Image generation disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            speaker,
            listener,
            persistence,
            services: Services {
                chat,
                lookup: Box::new(WikipediaLookup::new(&config.lookup)?),
                images,
                browser: Box::new(SystemBrowser),
                lookup_sentences: config.lookup.sentences,
            },
        })
    }
}

/// One interactive assistant session
pub struct Assistant {
    conversation: ConversationStore,
    speech: Arc<SpeechQueue>,
    interpreter: CommandInterpreter,
    listener: Option<Box<dyn Listener>>,
}

impl Assistant {
    pub fn new(config: &AssistantConfig, collaborators: Collaborators) -> Result<Self> {
        let Collaborators {
            speaker,
            listener,
            persistence,
            services,
        } = collaborators;

        let conversation = match persistence {
            Some(store) => ConversationStore::with_persistence(store),
            None => ConversationStore::new(),
        };

        let speech = Arc::new(SpeechQueue::new(speaker, config.speech_config()));
        speech.start()?;

        let interpreter = CommandInterpreter::new(services, conversation.clone(), Arc::clone(&speech));

        info!(
            "Assistant ready (chat: {}, images: {}, persistence: {}, voice input: {})",
            interpreter.has_chat(),
            interpreter.has_images(),
            conversation.is_persistent(),
            listener.is_some()
        );

        Ok(Self {
            conversation,
            speech,
            interpreter,
            listener,
        })
    }

    /// Greet the user if the transcript is empty
    pub fn welcome(&self) -> Option<Message> {
        if !self.conversation.is_empty() {
            return None;
        }

        let greeting = greeting_for_hour(Local::now().hour());
        let message = Message::assistant(format!("{} {}", greeting, WELCOME));
        self.conversation.append(message.clone());
        self.speak(&message.content);
        Some(message)
    }

    /// Interpret typed text
    pub fn submit(&mut self, text: &str) -> Message {
        self.interpreter.interpret(text)
    }

    /// Capture one spoken phrase and interpret it.
    ///
    /// Capture failures are returned as-is; nothing is interpreted.
    pub fn listen(&mut self) -> std::result::Result<Message, CaptureError> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| CaptureError::Unavailable("voice input is not configured".into()))?;

        let query = listener.listen()?;
        Ok(self.interpreter.interpret(&query))
    }

    pub fn has_voice_input(&self) -> bool {
        self.listener.is_some()
    }

    /// Speak the message at `index` again. Out-of-range indexes are ignored.
    pub fn replay(&self, index: usize) -> bool {
        match self.conversation.get(index) {
            Some(message) => {
                self.speak(&message.content);
                true
            }
            None => false,
        }
    }

    pub fn toggle_pause(&self) -> bool {
        self.speech.toggle_pause()
    }

    pub fn stop_speech(&self) {
        self.speech.stop();
    }

    pub fn status(&self) -> AssistantStatus {
        if self.speech.is_speaking() && self.speech.is_paused() {
            AssistantStatus::Paused
        } else if self.speech.is_speaking() {
            AssistantStatus::Speaking
        } else {
            AssistantStatus::Ready
        }
    }

    /// Discard the transcript and start a fresh session
    pub fn new_session(&mut self) -> SessionId {
        self.interpreter.reset_chat();
        self.conversation.start_new_session()
    }

    /// Replace the transcript with a persisted session
    pub fn load_session(&mut self, session_id: &SessionId) -> Result<usize> {
        let count = self.conversation.load(session_id)?;
        self.interpreter.reset_chat();
        Ok(count)
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionId>> {
        self.conversation.list_sessions()
    }

    pub fn session_id(&self) -> SessionId {
        self.conversation.session_id()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.conversation.messages()
    }

    pub fn is_persistent(&self) -> bool {
        self.conversation.is_persistent()
    }

    pub fn speech(&self) -> &Arc<SpeechQueue> {
        &self.speech
    }

    /// Stop speech and terminate the speech worker
    pub fn shutdown(&self) {
        self.speech.shutdown();
    }

    fn speak(&self, text: &str) {
        if let Err(e) = self.speech.enqueue(text) {
            warn!("Could not queue speech: {}", e);
        }
    }
}
