//! Command recognition and execution
//!
//! A recognized or typed utterance is first classified into a [`Command`]
//! (pure, no side effects), then executed by the [`CommandInterpreter`].
//!
//! Classification order is a priority order: the first rule that matches
//! wins.
//!
//! | Rule | Command |
//! |------|---------|
//! | blank input | `Empty` |
//! | starts with "generate image"/"create image", contains "draw"/"picture of" | `GenerateImage` (only when image generation is enabled) |
//! | contains "wikipedia" | `Lookup` |
//! | contains "open youtube"/"open google"/"open stackoverflow" | `Navigate` |
//! | contains "the time" | `Time` |
//! | contains "goodbye"/"exit" | `Farewell` |
//! | anything else | `General` |

pub mod interpreter;

pub use interpreter::{clock_time, CommandInterpreter, Services};

const IMAGE_PREFIXES: [&str; 2] = ["generate image", "create image"];
const IMAGE_KEYWORDS: [&str; 2] = ["draw", "picture of"];

/// Sites reachable through a navigation command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    YouTube,
    Google,
    StackOverflow,
}

impl Site {
    const ALL: [Site; 3] = [Site::YouTube, Site::Google, Site::StackOverflow];

    fn trigger(&self) -> &'static str {
        match self {
            Site::YouTube => "open youtube",
            Site::Google => "open google",
            Site::StackOverflow => "open stackoverflow",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Site::YouTube => "https://youtube.com",
            Site::Google => "https://google.com",
            Site::StackOverflow => "https://stackoverflow.com",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Site::YouTube => "YouTube",
            Site::Google => "Google",
            Site::StackOverflow => "Stack Overflow",
        }
    }
}

/// What an utterance asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Nothing was said
    Empty,

    /// Generate an image from `prompt`
    GenerateImage { prompt: String },

    /// Summarize `topic` from the encyclopedia
    Lookup { topic: String },

    /// Open a site in the browser
    Navigate(Site),

    /// Tell the current time
    Time,

    /// Say goodbye
    Farewell,

    /// Free-form question for the chat model
    General { query: String },
}

impl Command {
    /// Classify `query`. Matching is case-insensitive; the image rule only
    /// applies when `image_enabled` is set.
    pub fn parse(query: &str, image_enabled: bool) -> Self {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        let normalized = trimmed.to_lowercase();

        if image_enabled {
            if let Some(prompt) = image_prompt(&normalized) {
                return Command::GenerateImage { prompt };
            }
        }

        if normalized.contains("wikipedia") {
            return Command::Lookup {
                topic: normalized.replace("wikipedia", "").trim().to_string(),
            };
        }

        if let Some(site) = Site::ALL.into_iter().find(|s| normalized.contains(s.trigger())) {
            return Command::Navigate(site);
        }

        if normalized.contains("the time") {
            return Command::Time;
        }

        if normalized.contains("goodbye") || normalized.contains("exit") {
            return Command::Farewell;
        }

        Command::General {
            query: trimmed.to_string(),
        }
    }
}

/// Prompt for an image request, or None if `query` is not one.
///
/// The first occurrence of the matched trigger is removed; if nothing is
/// left the whole query becomes the prompt.
fn image_prompt(query: &str) -> Option<String> {
    let trigger = IMAGE_PREFIXES
        .into_iter()
        .find(|p| query.starts_with(p))
        .or_else(|| IMAGE_KEYWORDS.into_iter().find(|k| query.contains(k)))?;

    let remainder = query.replacen(trigger, "", 1);
    let remainder = remainder.trim();
    Some(if remainder.is_empty() {
        query.to_string()
    } else {
        remainder.to_string()
    })
}
