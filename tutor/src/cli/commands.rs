//! CLI command execution.
//!
//! Every command opens the file store, resolves settings, and reports
//! failures as a one-line notice through `anyhow`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use crate::conversation::{ChatOptions, ConversationManager, MAX_ATTACHMENT_BYTES};
use crate::courses;
use crate::export::{self, ExportFormat};
use crate::generators::{self, DataUri, ANALYSIS_MODEL};
use crate::llm::{GeminiClient, DEFAULT_TIMEOUT};
use crate::models::{ChatSession, Message};
use crate::sessions::SessionStore;
use crate::settings::{self, Settings, KNOWN_MODELS};
use crate::storage::{FileStore, HOME_ENV};

use super::args::{Cli, Commands, ConfigAction, SessionAction};

/// Environment variable overriding the Gemini API base URL.
const API_BASE_ENV: &str = "TUTOR_API_BASE";

type Manager = ConversationManager<GeminiClient, FileStore>;
type Sessions = Arc<Mutex<SessionStore<FileStore>>>;

/// Global options that apply to every command.
struct RunOptions {
    model: Option<String>,
    system_prompt: Option<String>,
    api_key: Option<String>,
}

impl From<&Cli> for RunOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            model: cli.model.clone(),
            system_prompt: cli.system_prompt.clone(),
            api_key: cli.api_key.clone(),
        }
    }
}

impl RunOptions {
    /// Resolve settings: flags, then environment, then stored values.
    fn settings(&self) -> Result<Settings> {
        let store = FileStore::open()?;
        Ok(Settings::load(&store).with_env().with_overrides(
            self.model.as_deref(),
            self.system_prompt.as_deref(),
            self.api_key.as_deref(),
        ))
    }
}

// === Setup ===

fn open_sessions() -> Result<Sessions> {
    let store = FileStore::open().context("Failed to open tutor storage")?;
    Ok(Arc::new(Mutex::new(SessionStore::open(store))))
}

fn gemini_client(settings: &Settings) -> Result<GeminiClient> {
    let base_url = std::env::var(API_BASE_ENV).ok();
    GeminiClient::new(&settings.api_key, base_url.as_deref(), DEFAULT_TIMEOUT).context(
        "No Gemini API key configured. Set GEMINI_API_KEY or run `tutor config set-api-key <key>`",
    )
}

fn manager(settings: &Settings) -> Result<Arc<Manager>> {
    let client = gemini_client(settings)?;
    Ok(Arc::new(ConversationManager::new(client, open_sessions()?)))
}

fn chat_options(settings: &Settings) -> ChatOptions {
    ChatOptions {
        system_prompt: settings.system_prompt.clone(),
        model: settings.model.clone(),
    }
}

/// Cancel the session's in-flight request when Ctrl-C is pressed.
fn cancel_on_ctrl_c(manager: &Arc<Manager>, session_id: &str) -> tokio::task::JoinHandle<()> {
    let manager = Arc::clone(manager);
    let session_id = session_id.to_string();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && manager.is_busy(&session_id) {
            eprintln!("\nCancelling...");
            manager.cancel(&session_id);
        }
    })
}

/// Resolve a full session ID from an ID or unique prefix.
fn resolve_session_id(sessions: &[ChatSession], id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        bail!("A session ID is required");
    }
    if let Some(session) = sessions.iter().find(|s| s.id == id) {
        return Ok(session.id.clone());
    }
    let matches: Vec<&ChatSession> = sessions.iter().filter(|s| s.id.starts_with(id)).collect();
    match matches.as_slice() {
        [session] => Ok(session.id.clone()),
        [] => bail!("No session matches '{id}'"),
        _ => bail!("'{id}' matches {} sessions, use a longer prefix", matches.len()),
    }
}

fn short_id(id: &str) -> &str {
    // Time-ordered ids share a prefix; the tail is what differs.
    let start = id.char_indices().rev().nth(7).map_or(0, |(i, _)| i);
    &id[start..]
}

fn read_attachment(path: &Path) -> Result<String> {
    let len = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .len();
    if !usize::try_from(len).is_ok_and(|len| len <= MAX_ATTACHMENT_BYTES) {
        bail!("{} is larger than 5MB", path.display());
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("{} is not a readable text file", path.display()))
}

fn write_media(media: &DataUri, out: &Path) -> Result<()> {
    let bytes = media.decode()?;
    std::fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))
}

fn print_reply(messages: &[Message]) {
    if let Some(reply) = messages.last() {
        println!("{}", reply.content);
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let opts = RunOptions::from(&cli);

    match cli.command {
        Some(Commands::Chat { file, message }) => {
            send_message(&message.join(" "), file.as_deref(), &opts).await
        }
        Some(Commands::Regenerate) => regenerate(&opts).await,
        Some(Commands::Sessions { action }) => {
            manage_sessions(action.unwrap_or(SessionAction::List))
        }
        Some(Commands::History) => show_history(),
        Some(Commands::Clear) => clear_chat(),
        Some(Commands::Export { format, out }) => export_chat(format, out),
        Some(Commands::Config { action }) => configure(action.unwrap_or(ConfigAction::Show), &opts),
        Some(Commands::Image { out, open, prompt }) => {
            create_image(&prompt.join(" "), out, open, &opts).await
        }
        Some(Commands::Story { out, topic }) => tell_story(&topic.join(" "), out, &opts).await,
        Some(Commands::Speak { last, out, text }) => {
            speak(last, &text.join(" "), &out, &opts).await
        }
        Some(Commands::Analyze {
            csv,
            json,
            question,
        }) => analyze(&csv, &question.join(" "), json, &opts).await,
        Some(Commands::Courses) => {
            list_courses();
            Ok(())
        }
        Some(Commands::Course { language }) => show_course(&language),
        None => {
            let message = cli.message.join(" ");
            if message.trim().is_empty() {
                println!("Tutor - chat with an AI programming tutor");
                println!();
                println!("Usage: tutor [OPTIONS] [MESSAGE]...");
                println!("       tutor <COMMAND>");
                println!();
                println!("Run `tutor --help` for the list of commands.");
                return Ok(());
            }
            send_message(&message, None, &opts).await
        }
    }
}

async fn send_message(message: &str, file: Option<&Path>, opts: &RunOptions) -> Result<()> {
    let settings = opts.settings()?;
    let attachment = file.map(read_attachment).transpose()?;
    let manager = manager(&settings)?;
    let session_id = manager.sessions().lock().active_id().to_string();

    let watcher = cancel_on_ctrl_c(&manager, &session_id);
    let result = manager
        .send_message(&session_id, message, attachment.as_deref(), &chat_options(&settings))
        .await;
    watcher.abort();

    let messages = result.context("Message not sent")?;
    print_reply(&messages);
    Ok(())
}

async fn regenerate(opts: &RunOptions) -> Result<()> {
    let settings = opts.settings()?;
    let manager = manager(&settings)?;
    let session_id = manager.sessions().lock().active_id().to_string();

    let watcher = cancel_on_ctrl_c(&manager, &session_id);
    let result = manager.regenerate(&session_id, &chat_options(&settings)).await;
    watcher.abort();

    let messages = result.context("Could not regenerate the response")?;
    print_reply(&messages);
    Ok(())
}

fn manage_sessions(action: SessionAction) -> Result<()> {
    let sessions = open_sessions()?;
    let mut sessions = sessions.lock();

    match action {
        SessionAction::List => {
            println!("  {:<10} {:<42} {:<6} {}", "ID", "TITLE", "MSGS", "CREATED");
            println!("{}", "-".repeat(80));
            let active = sessions.active_id().to_string();
            for session in sessions.list_sessions() {
                let marker = if session.id == active { '*' } else { ' ' };
                println!(
                    "{marker} {:<10} {:<42} {:<6} {}",
                    short_id(&session.id),
                    session.title(),
                    session.messages.len(),
                    session.created_at.format("%Y-%m-%d %H:%M"),
                );
            }
        }
        SessionAction::New => {
            let session = sessions.create_session();
            sessions.set_active_session(&session.id)?;
            println!("Started new chat {}", short_id(&session.id));
        }
        SessionAction::Delete { id } => {
            let id = resolve_session_id(sessions.list_sessions(), &id)?;
            sessions.delete_session(&id);
            println!("Deleted chat {}", short_id(&id));
            println!("Active chat: {}", short_id(sessions.active_id()));
        }
        SessionAction::Select { id } => {
            let id = resolve_session_id(sessions.list_sessions(), &id)?;
            sessions.set_active_session(&id)?;
            println!("Active chat: {} ({})", short_id(&id), sessions.active_session().title());
        }
    }
    Ok(())
}

fn show_history() -> Result<()> {
    let sessions = open_sessions()?;
    let sessions = sessions.lock();
    let session = sessions.active_session();

    if session.messages.is_empty() {
        println!("No messages yet. Ask the tutor something!");
        return Ok(());
    }

    for message in &session.messages {
        println!("[{}]:", message.role.as_str().to_uppercase());
        println!("{}", message.content);
        println!();
    }
    Ok(())
}

fn clear_chat() -> Result<()> {
    let sessions = open_sessions()?;
    let mut sessions = sessions.lock();
    let id = sessions.active_id().to_string();
    sessions.clear_messages(&id);
    println!("Chat cleared.");
    Ok(())
}

fn export_chat(format: ExportFormat, out: Option<PathBuf>) -> Result<()> {
    let sessions = open_sessions()?;
    let session = sessions.lock().active_session().clone();
    let path = out.unwrap_or_else(|| export::default_file_name(&session, format));

    export::export_session(&session, format, &path).context("Failed to save chat")?;
    println!("Saved chat to {}", path.display());
    Ok(())
}

fn configure(action: ConfigAction, opts: &RunOptions) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = opts.settings()?;
            println!("Storage:       {}", FileStore::open()?.path().display());
            println!("Model:         {}", settings.model);
            println!("API key:       {}", settings.masked_api_key());
            println!("System prompt: {}", settings.system_prompt);
            if std::env::var(HOME_ENV).is_ok() {
                println!("(data dir set by {HOME_ENV})");
            }
        }
        ConfigAction::Models => {
            let current = opts.settings()?.model;
            for (id, name) in KNOWN_MODELS {
                let marker = if *id == current { '*' } else { ' ' };
                println!("{marker} {id:<34} {name}");
            }
        }
        ConfigAction::SetModel { model } => {
            let mut store = FileStore::open()?;
            if !settings::set_model(&mut store, &model) {
                bail!("Failed to save model");
            }
            if !settings::is_known_model(&model) {
                println!("Warning: {model} is not a known model");
            }
            println!("Model set to {}", model.trim());
        }
        ConfigAction::SetApiKey { key } => {
            let mut store = FileStore::open()?;
            if !settings::set_api_key(&mut store, &key) {
                bail!("Failed to save API key");
            }
            println!("API key saved.");
        }
        ConfigAction::SetSystemPrompt { prompt } => {
            let mut store = FileStore::open()?;
            if !settings::set_system_prompt(&mut store, &prompt.join(" ")) {
                bail!("Failed to save system prompt");
            }
            println!("System prompt saved.");
        }
    }
    Ok(())
}

async fn create_image(
    prompt: &str,
    out: Option<PathBuf>,
    open: bool,
    opts: &RunOptions,
) -> Result<()> {
    let client = gemini_client(&opts.settings()?)?;
    let image = generators::generate_image(&client, prompt)
        .await
        .context("Image generation failed")?;

    let path = out.unwrap_or_else(|| PathBuf::from(format!("image.{}", image.image.extension())));
    write_media(&image.image, &path)?;
    println!("Saved image to {}", path.display());
    if let Some(caption) = image.caption {
        println!("{caption}");
    }

    if open {
        open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    }
    Ok(())
}

async fn tell_story(topic: &str, out: Option<PathBuf>, opts: &RunOptions) -> Result<()> {
    let client = gemini_client(&opts.settings()?)?;
    let story = generators::generate_story(&client, topic)
        .await
        .context("Story generation failed")?;

    println!("{}", story.story);
    let path = out.unwrap_or_else(|| PathBuf::from(format!("story.{}", story.image.extension())));
    write_media(&story.image, &path)?;
    println!();
    println!("Illustration saved to {}", path.display());
    Ok(())
}

async fn speak(last: bool, text: &str, out: &Path, opts: &RunOptions) -> Result<()> {
    let text = if last {
        let sessions = open_sessions()?;
        let sessions = sessions.lock();
        let reply = sessions
            .active_session()
            .messages
            .iter()
            .rev()
            .find(|m| !m.is_user())
            .map(|m| m.content.clone());
        reply.context("The active chat has no reply to read")?
    } else {
        text.to_string()
    };

    let client = gemini_client(&opts.settings()?)?;
    let speech = generators::text_to_speech(&client, &text)
        .await
        .context("Speech generation failed")?;
    write_media(&speech.audio, out)?;
    println!("Saved audio to {}", out.display());
    Ok(())
}

async fn analyze(csv: &Path, question: &str, json: bool, opts: &RunOptions) -> Result<()> {
    generators::check_csv_path(csv)?;
    let data = read_attachment(csv)?;

    let settings = opts.settings()?;
    let client = gemini_client(&settings)?;
    let model = opts.model.as_deref().unwrap_or(ANALYSIS_MODEL);
    let analysis = generators::analyze_data(&client, model, &data, question)
        .await
        .context("Data analysis failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("{}", analysis.analysis);
    println!();

    let chart = &analysis.chart;
    let columns: Vec<&str> = std::iter::once(chart.x_axis_key.as_str())
        .chain(chart.y_axis_keys.iter().map(String::as_str))
        .collect();
    let header: Vec<String> = columns.iter().map(|k| format!("{:<16}", chart.label(k))).collect();
    println!("{}", header.join(" "));
    println!("{}", "-".repeat(17 * columns.len()));
    for row in &chart.data {
        let cells: Vec<String> = columns
            .iter()
            .map(|k| {
                let cell = row.get(*k).map_or_else(String::new, |v| {
                    v.as_str().map_or_else(|| v.to_string(), str::to_string)
                });
                format!("{cell:<16}")
            })
            .collect();
        println!("{}", cells.join(" "));
    }
    Ok(())
}

fn list_courses() {
    for course in courses::COURSES {
        println!("{:<12} {}", course.slug, course.name);
        println!("{:<12} {}", "", course.description);
    }
}

fn show_course(language: &str) -> Result<()> {
    let course = courses::find(language).with_context(|| format!("Course not found: {language}"))?;
    println!("{}", course.name);
    println!("{}", course.description);
    println!();
    for (i, topic) in course.topics.iter().enumerate() {
        println!("{:>2}. {topic}", i + 1);
    }
    Ok(())
}
