//! Executes classified commands against the assistant's collaborators

use super::Command;
use crate::llm::ChatSession;
use crate::messages::{ConversationStore, Message};
use crate::services::{Browser, ImageGenerator, Lookup};
use crate::speech::SpeechQueue;
use chrono::{Local, NaiveTime};
use std::sync::Arc;
use tracing::{debug, warn};

pub const NO_INPUT: &str = "I didn't hear anything. Please try again.";
pub const IMAGE_FAILED: &str =
    "I'm sorry, I couldn't generate that image. Please try a different description.";
pub const LOOKUP_FAILED: &str = "Sorry, I couldn't find any results on Wikipedia.";
pub const FAREWELL: &str = "Have a good day! Start a new session whenever you want to talk again.";
pub const CHAT_FAILED: &str = "Sorry, I couldn't process that request.";
pub const NO_INFORMATION: &str =
    "I couldn't find information on that. Configure a language model for better responses.";

/// External services the interpreter delegates to
pub struct Services {
    /// Chat model; None falls back to encyclopedia lookups
    pub chat: Option<Box<dyn ChatSession>>,

    pub lookup: Box<dyn Lookup>,

    /// Image generator; None disables image commands
    pub images: Option<Box<dyn ImageGenerator>>,

    pub browser: Box<dyn Browser>,

    /// Sentences per encyclopedia summary
    pub lookup_sentences: usize,
}

/// Turns utterances into assistant replies.
///
/// Each non-empty query appends the user message and exactly one assistant
/// message to the conversation, then queues the reply for speech.
pub struct CommandInterpreter {
    services: Services,
    conversation: ConversationStore,
    speech: Arc<SpeechQueue>,
}

impl CommandInterpreter {
    pub fn new(services: Services, conversation: ConversationStore, speech: Arc<SpeechQueue>) -> Self {
        Self {
            services,
            conversation,
            speech,
        }
    }

    pub fn has_chat(&self) -> bool {
        self.services.chat.is_some()
    }

    pub fn has_images(&self) -> bool {
        self.services.images.is_some()
    }

    /// Forget the chat model's history
    pub fn reset_chat(&mut self) {
        if let Some(chat) = self.services.chat.as_mut() {
            chat.reset();
        }
    }

    /// Interpret one utterance and return the assistant's reply
    pub fn interpret(&mut self, query: &str) -> Message {
        let command = Command::parse(query, self.has_images());
        debug!("Interpreting {:?}", command);

        if command == Command::Empty {
            let reply = Message::assistant(NO_INPUT);
            self.speak(&reply.content);
            return reply;
        }

        self.conversation.append(Message::user(query.trim()));
        let reply = self.execute(command);
        self.conversation.append(reply.clone());
        self.speak(&reply.content);
        reply
    }

    fn execute(&mut self, command: Command) -> Message {
        match command {
            Command::Empty => Message::assistant(NO_INPUT),
            Command::GenerateImage { prompt } => self.generate_image(&prompt),
            Command::Lookup { topic } => Message::assistant(self.lookup(&topic)),
            Command::Navigate(site) => {
                if let Err(e) = self.services.browser.open(site.url()) {
                    warn!("Failed to open {}: {}", site.url(), e);
                }
                Message::assistant(format!("Opening {} in a new tab.", site.name()))
            }
            Command::Time => {
                Message::assistant(format!("The time is {}", clock_time(Local::now().time())))
            }
            Command::Farewell => Message::assistant(FAREWELL),
            Command::General { query } => Message::assistant(self.answer(&query)),
        }
    }

    fn generate_image(&self, prompt: &str) -> Message {
        let Some(images) = self.services.images.as_ref() else {
            return Message::assistant(IMAGE_FAILED);
        };

        match images.generate(prompt) {
            Ok(image) => Message::assistant_with_image(
                format!("Generating an image based on: {}", prompt),
                image,
            ),
            Err(e) => {
                warn!("Image generation failed: {}", e);
                Message::assistant(IMAGE_FAILED)
            }
        }
    }

    fn lookup(&self, topic: &str) -> String {
        match self
            .services
            .lookup
            .summarize(topic, self.services.lookup_sentences)
        {
            Ok(summary) => format!("According to Wikipedia: {}", summary),
            Err(e) => {
                warn!("Lookup failed: {}", e);
                LOOKUP_FAILED.to_string()
            }
        }
    }

    fn answer(&mut self, query: &str) -> String {
        if let Some(chat) = self.services.chat.as_mut() {
            return match chat.send(query) {
                Ok(reply) => {
                    // Markdown emphasis reads badly when spoken
                    let cleaned = reply.replace('*', "");
                    if cleaned.trim().is_empty() {
                        CHAT_FAILED.to_string()
                    } else {
                        cleaned.trim().to_string()
                    }
                }
                Err(e) => {
                    warn!("Chat request failed: {}", e);
                    CHAT_FAILED.to_string()
                }
            };
        }

        match self
            .services
            .lookup
            .summarize(query, self.services.lookup_sentences)
        {
            Ok(summary) => format!("According to Wikipedia: {}", summary),
            Err(e) => {
                warn!("Fallback lookup failed: {}", e);
                NO_INFORMATION.to_string()
            }
        }
    }

    fn speak(&self, text: &str) {
        if let Err(e) = self.speech.enqueue(text) {
            warn!("Could not queue speech: {}", e);
        }
    }
}

/// 24-hour `HH:MM:SS`
pub fn clock_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}
