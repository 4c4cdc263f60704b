use anyhow::{Context as _, Result};
use clap::Parser;
use murmur::integration::{Assistant, AssistantConfig, Collaborators};
use murmur::messages::{Message, SessionId};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const COMMANDS: &[(&str, &str)] = &[
    ("/listen", "capture one spoken request"),
    ("/pause", "pause or resume speech"),
    ("/stop", "stop speech and drop queued replies"),
    ("/replay", "<n> speak message n again"),
    ("/history", "show the transcript"),
    ("/new", "start a new session"),
    ("/sessions", "list saved sessions"),
    ("/load", "<id> load a saved session"),
    ("/status", "show what the assistant is doing"),
    ("/help", "show this help"),
    ("/quit", "exit"),
];

/// Voice-enabled conversational assistant
#[derive(Parser, Debug)]
#[command(name = "murmur", version, about)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print speech instead of vocalizing it
    #[arg(long)]
    text_only: bool,

    /// SQLite database for transcripts
    #[arg(long)]
    db: Option<PathBuf>,

    /// Load a saved session on start
    #[arg(long)]
    session: Option<String>,

    /// Skip the welcome greeting
    #[arg(long)]
    no_greeting: bool,
}

/// Slash-command completion and hints
struct ReplHelper;

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, _)| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Murmur voice assistant");

    let mut config = AssistantConfig::load(args.config.as_deref())?
        .with_env()
        .with_text_only(args.text_only);
    if let Some(db) = args.db {
        config = config.with_database(db);
    }

    let collaborators = Collaborators::from_config(&config)?;
    let mut assistant = Assistant::new(&config, collaborators)?;

    if let Some(id) = args.session {
        let session_id = SessionId::from(id);
        match assistant.load_session(&session_id) {
            Ok(count) => println!("Loaded session {} ({} messages)", session_id, count),
            Err(e) => warn!("Could not load session {}: {}", session_id, e),
        }
    }

    if !args.no_greeting {
        if let Some(greeting) = assistant.welcome() {
            print_reply(&greeting);
        }
    }

    let mut editor: Editor<ReplHelper, DefaultHistory> =
        Editor::new().context("failed to initialize line editor")?;
    editor.set_helper(Some(ReplHelper));

    println!("Type a request, or /help for commands.");

    loop {
        match editor.readline("you> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                if line.starts_with('/') {
                    if !run_command(&mut assistant, line) {
                        break;
                    }
                } else {
                    let reply = assistant.submit(line);
                    print_reply(&reply);
                }
            }
            // Ctrl-C silences the assistant but keeps the session
            Err(ReadlineError::Interrupted) => assistant.stop_speech(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }

    assistant.shutdown();
    info!("Murmur stopped");
    Ok(())
}

/// Run one slash command. Returns false when the REPL should exit.
fn run_command(assistant: &mut Assistant, line: &str) -> bool {
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "/listen" => {
            if !assistant.has_voice_input() {
                println!("Voice input is not configured. Set [capture] command in the config file.");
                return true;
            }
            println!("Listening...");
            match assistant.listen() {
                Ok(reply) => print_reply(&reply),
                Err(e) => println!("{}", e.user_message()),
            }
        }
        "/pause" => {
            if assistant.toggle_pause() {
                println!("Paused");
            } else {
                println!("{}", assistant.status().label());
            }
        }
        "/stop" => assistant.stop_speech(),
        "/replay" => match argument.parse::<usize>() {
            Ok(index) if assistant.replay(index) => {}
            _ => println!("No message at index '{}'. See /history.", argument),
        },
        "/history" => {
            for (index, message) in assistant.messages().iter().enumerate() {
                println!("{:>3} {:>9}: {}", index, message.role.as_str(), message.content);
            }
        }
        "/new" => {
            let session_id = assistant.new_session();
            println!("Started session {}", session_id);
        }
        "/sessions" => match assistant.list_sessions() {
            Ok(sessions) if sessions.is_empty() => println!("No saved sessions."),
            Ok(sessions) => {
                let current = assistant.session_id();
                for session in sessions {
                    let marker = if session == current { "*" } else { " " };
                    println!("{} {}", marker, session);
                }
            }
            Err(e) => println!("{}", e.user_message()),
        },
        "/load" => {
            if argument.is_empty() {
                println!("Usage: /load <session id>");
                return true;
            }
            match assistant.load_session(&SessionId::from(argument)) {
                Ok(count) => println!("Loaded {} messages.", count),
                Err(e) => println!("{}", e.user_message()),
            }
        }
        "/status" => {
            println!(
                "{} (session {}, {} queued)",
                assistant.status().label(),
                assistant.session_id().short(),
                assistant.speech().pending()
            );
        }
        "/help" => {
            for (cmd, help) in COMMANDS {
                println!("  {:<10} {}", cmd, help);
            }
        }
        "/quit" | "/exit" => return false,
        other => println!("Unknown command {}. Type /help for commands.", other),
    }
    true
}

fn print_reply(message: &Message) {
    println!("assistant: {}", message.content);
    if let Some(image) = &message.image {
        let reference = image.as_str();
        let shown: String = reference.chars().take(64).collect();
        if shown.len() < reference.len() {
            println!("  [image] {}... ({} bytes)", shown, reference.len());
        } else {
            println!("  [image] {}", shown);
        }
    }
}
