//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::export::ExportFormat;

/// Tutor - chat with an AI programming tutor from the terminal
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Model to use for this run (e.g., googleai/gemini-1.5-pro-latest)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Replace the system prompt for this run
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Gemini API key (overrides the stored key)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Message to send to the active chat
    #[arg(trailing_var_arg = true)]
    pub message: Vec<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message to the active chat
    Chat {
        /// Attach a text file as context (max 5MB)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Message to send
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// Replace the reply to the last message with a fresh one
    Regenerate,

    /// List, create, delete or select chat sessions
    Sessions {
        #[command(subcommand)]
        action: Option<SessionAction>,
    },

    /// Show the active chat's messages
    History,

    /// Remove all messages from the active chat
    Clear,

    /// Export the active chat to a file
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "md")]
        format: ExportFormat,

        /// Output path (defaults to chat-history-<id>.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Generate an image from a prompt
    Image {
        /// Output path (defaults to image.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Open the image after saving
        #[arg(long)]
        open: bool,

        /// Image description
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },

    /// Write a short illustrated story about a topic
    Story {
        /// Where to save the illustration (defaults to story.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Story topic
        #[arg(trailing_var_arg = true, required = true)]
        topic: Vec<String>,
    },

    /// Read text aloud into a WAV file
    Speak {
        /// Speak the last assistant reply in the active chat
        #[arg(long, conflicts_with = "text")]
        last: bool,

        /// Output path
        #[arg(short, long, default_value = "speech.wav")]
        out: PathBuf,

        /// Text to speak
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Ask a question about a CSV file
    Analyze {
        /// CSV file to analyze
        #[arg(long)]
        csv: PathBuf,

        /// Print the raw JSON result
        #[arg(long)]
        json: bool,

        /// Question about the data
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,
    },

    /// List the available courses
    Courses,

    /// Show a course's topics
    Course {
        /// Course language (python, javascript, cplusplus, react)
        language: String,
    },
}

/// Session management actions
#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// List sessions (default)
    List,
    /// Start a new chat and make it active
    New,
    /// Delete a session
    Delete {
        /// Session ID (or unique prefix)
        id: String,
    },
    /// Make a session active
    Select {
        /// Session ID (or unique prefix)
        id: String,
    },
}

/// Settings actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current settings (default)
    Show,
    /// List known models
    Models,
    /// Store the default model
    SetModel { model: String },
    /// Store the API key
    SetApiKey { key: String },
    /// Store the system prompt
    SetSystemPrompt {
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
}
