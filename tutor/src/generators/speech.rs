//! Text-to-speech, returned as a WAV data URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::media::DataUri;
use crate::error::{Error, Result};
use crate::llm::{GenerateRequest, InferenceClient, LlmError, Modality};

/// Model used for speech output.
pub const TTS_MODEL: &str = "googleai/gemini-2.5-flash-preview-tts";
/// Prebuilt voice.
pub const TTS_VOICE: &str = "Algenib";

const DEFAULT_SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Synthesized speech.
#[derive(Debug, Clone)]
pub struct Speech {
    pub audio: DataUri,
}

/// Read `text` aloud. The model returns raw PCM, which is wrapped in a WAV container.
pub async fn text_to_speech<C>(client: &C, text: &str) -> Result<Speech>
where
    C: InferenceClient + ?Sized,
{
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("no text to speak".to_string()));
    }

    let request = GenerateRequest::prompt(TTS_MODEL, text)
        .with_modalities(&[Modality::Audio])
        .with_voice(TTS_VOICE);
    let response = client.generate(request).await?;
    let media = response.first_media("audio/").ok_or(LlmError::EmptyOutput)?;

    let pcm = STANDARD
        .decode(media.data.as_bytes())
        .map_err(|e| LlmError::Malformed(format!("audio payload is not base64: {e}")))?;
    let rate = sample_rate(&media.mime_type).unwrap_or(DEFAULT_SAMPLE_RATE);

    let wav = pcm_to_wav(&pcm, CHANNELS, rate, BITS_PER_SAMPLE);
    Ok(Speech {
        audio: DataUri::from_bytes("audio/wav", &wav),
    })
}

/// Parse `rate=<hz>` from a MIME type like `audio/L16;codec=pcm;rate=24000`.
fn sample_rate(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
}

/// Wrap little-endian PCM samples in a canonical 44-byte RIFF/WAVE header.
pub fn pcm_to_wav(pcm: &[u8], channels: u16, sample_rate: u32, bits_per_sample: u16) -> Vec<u8> {
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX - 36);

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16_u32.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerateResponse;
    use async_trait::async_trait;

    #[test]
    fn wav_header_describes_pcm() {
        let pcm = [0_u8, 1, 2, 3];
        let wav = pcm_to_wav(&pcm, 1, 24_000, 16);

        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 40);
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(u16::from_le_bytes(wav[32..34].try_into().unwrap()), 2);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 4);
        assert_eq!(&wav[44..], &pcm);
    }

    #[test]
    fn reads_rate_from_mime_type() {
        assert_eq!(sample_rate("audio/L16;codec=pcm;rate=16000"), Some(16_000));
        assert_eq!(sample_rate("audio/L16"), None);
    }

    struct Pcm;

    #[async_trait]
    impl InferenceClient for Pcm {
        async fn generate(
            &self,
            request: GenerateRequest,
        ) -> std::result::Result<GenerateResponse, LlmError> {
            assert_eq!(request.voice.as_deref(), Some(TTS_VOICE));
            assert_eq!(request.modalities, vec![Modality::Audio]);
            Ok(GenerateResponse::from_media(
                "audio/L16;codec=pcm;rate=24000",
                STANDARD.encode([1_u8, 0, 2, 0]),
            ))
        }
    }

    #[tokio::test]
    async fn speech_is_wav_data_uri() {
        let speech = text_to_speech(&Pcm, "Hello there").await.unwrap();
        assert_eq!(speech.audio.mime_type, "audio/wav");
        let wav = speech.audio.decode().unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[44..], &[1, 0, 2, 0]);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        assert!(matches!(
            text_to_speech(&Pcm, " ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
