//! Saving a chat transcript to a file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::{ChatSession, Message};

/// Transcript file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Pretty-printed JSON array of messages.
    Json,
    /// Markdown, one bold role heading per message.
    Md,
    /// Plain text.
    Txt,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Md => "md",
            Self::Txt => "txt",
        }
    }
}

/// Render `messages` in the given format.
pub fn render(messages: &[Message], format: ExportFormat) -> Result<String> {
    if messages.is_empty() {
        return Err(Error::InvalidInput("there are no messages to save".to_string()));
    }

    let rendered = match format {
        ExportFormat::Json => serde_json::to_string_pretty(messages)
            .map_err(|e| Error::InvalidInput(format!("cannot encode messages: {e}")))?,
        ExportFormat::Md => messages
            .iter()
            .map(|m| format!("**{}**: \n\n{}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"),
        ExportFormat::Txt => messages
            .iter()
            .map(|m| format!("{}:\n{}", m.role.as_str().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n====================\n\n"),
    };
    Ok(rendered)
}

/// Default file name for a session transcript.
pub fn default_file_name(session: &ChatSession, format: ExportFormat) -> PathBuf {
    PathBuf::from(format!("chat-history-{}.{}", session.id, format.extension()))
}

/// Write the session transcript to `path`.
pub fn export_session(session: &ChatSession, format: ExportFormat, path: &Path) -> Result<()> {
    let content = render(&session.messages, format)?;
    std::fs::write(path, content)?;
    tracing::info!(session = %session.id, path = %path.display(), "Saved chat");
    Ok(())
}
