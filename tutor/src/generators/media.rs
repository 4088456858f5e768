//! `data:` URIs for generated images and audio.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};

/// A base64 `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Parse a `data:` URI. Only base64 payloads are accepted.
    #[cfg(test)]
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("not a data URI".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("data URI has no payload".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidInput("data URI is not base64".to_string()))?;
        Ok(Self::new(mime_type, data))
    }

    /// Decode the payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid base64 payload: {e}")))
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "audio/wav" | "audio/x-wav" => "wav",
            _ => "bin",
        }
    }
}

impl std::fmt::Display for DataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_parses() {
        let uri = DataUri::from_bytes("image/png", b"png-bytes");
        let text = uri.to_string();
        assert!(text.starts_with("data:image/png;base64,"));

        let parsed = DataUri::parse(&text).unwrap();
        assert_eq!(parsed, uri);
        assert_eq!(parsed.decode().unwrap(), b"png-bytes");
        assert_eq!(parsed.extension(), "png");
    }

    #[test]
    fn rejects_non_base64_uris() {
        assert!(DataUri::parse("https://example.com/a.png").is_err());
        assert!(DataUri::parse("data:text/plain,hello").is_err());
        assert!(DataUri::parse("data:image/png;base64").is_err());
        assert!(DataUri::new("image/png", "!!!").decode().is_err());
    }
}
