//! Tutor - an AI programming tutor for the terminal.
//!
//! Chats are kept as sessions in a local JSON key-value store. Replies,
//! images, stories, speech and data analysis come from the Gemini API.
//!
//! Architecture:
//! - `sessions` owns the session list and writes every change through to `storage`
//! - `conversation` sends turns and regenerates replies with rollback on failure
//! - `generators` are one-shot calls that never touch sessions

mod cli;
mod conversation;
mod courses;
mod error;
mod export;
mod generators;
mod llm;
mod logging;
mod models;
mod sessions;
mod settings;
mod storage;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    execute(cli).await
}
