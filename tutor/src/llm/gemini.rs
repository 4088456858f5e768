//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{GenerateRequest, GenerateResponse, InferenceClient, InlineMedia, LlmError};
use crate::models::MessageRole;

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Header carrying the API key. The key never appears in the request URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Provider prefix accepted on model identifiers.
const MODEL_PREFIX: &str = "googleai/";

/// HTTP client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a client. An empty API key is rejected.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(model_name(model))
        )
    }
}

/// Strip the provider prefix (`googleai/`) and any `models/` path prefix.
pub fn model_name(model: &str) -> &str {
    let model = model.trim();
    let model = model.strip_prefix(MODEL_PREFIX).unwrap_or(model);
    model.strip_prefix("models/").unwrap_or(model)
}

/// Build the JSON body for a `generateContent` call.
fn request_body(request: &GenerateRequest) -> Value {
    let contents: Vec<Value> = request
        .contents
        .iter()
        .map(|m| {
            let role = match m.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut body = json!({ "contents": contents });

    if let Some(ref instruction) = request.system_instruction {
        if !instruction.trim().is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
    }

    let mut config = serde_json::Map::new();
    if !request.modalities.is_empty() {
        config.insert("responseModalities".into(), json!(request.modalities));
    }
    if let Some(ref voice) = request.voice {
        config.insert(
            "speechConfig".into(),
            json!({ "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } } }),
        );
    }
    if request.json_output {
        config.insert("responseMimeType".into(), json!("application/json"));
    }
    if !config.is_empty() {
        body["generationConfig"] = Value::Object(config);
    }

    body
}

// === Wire format ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WireFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    inline_data: Option<WireInlineData>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

/// Fold a successful response body into text and media.
fn parse_response(body: &str) -> Result<GenerateResponse, LlmError> {
    let wire: WireResponse = serde_json::from_str(body)?;

    let Some(candidate) = wire.candidates.into_iter().next() else {
        if let Some(reason) = wire.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Blocked(reason));
        }
        return Err(LlmError::EmptyOutput);
    };

    let mut text = String::new();
    let mut media = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if part.thought {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(data) = part.inline_data {
            media.push(InlineMedia {
                mime_type: data.mime_type,
                data: data.data,
            });
        }
    }

    Ok(GenerateResponse {
        text: if text.is_empty() { None } else { Some(text) },
        media,
        finish_reason: candidate.finish_reason,
    })
}

/// Extract the provider's error message from a failed response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<WireErrorBody>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |b| b.error.message,
    )
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        e.without_url().into()
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let body = request_body(&request);
        tracing::debug!(
            model = model_name(&request.model),
            turns = request.contents.len(),
            modalities = ?request.modalities,
            "Sending generateContent request"
        );

        let resp = self
            .http
            .post(self.endpoint(&request.model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = error_message(&text);
            tracing::warn!(status = status.as_u16(), %message, "Inference request failed");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response = parse_response(&text)?;
        tracing::debug!(
            finish_reason = response.finish_reason.as_deref().unwrap_or("-"),
            media = response.media.len(),
            "Received generateContent response"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Modality;
    use crate::models::Message;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn strips_provider_prefix() {
        assert_eq!(model_name("googleai/gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(model_name("models/gemini-1.0-pro"), "gemini-1.0-pro");
        assert_eq!(model_name("gemini-1.5-pro-latest"), "gemini-1.5-pro-latest");
    }

    #[test]
    fn body_maps_assistant_to_model_role() {
        let mut request = GenerateRequest::prompt("googleai/gemini-2.0-flash", "And now?")
            .with_system_instruction("Be brief.");
        request.contents.insert(0, Message::user("Hi"));
        request.contents.insert(1, Message::assistant("Hello!"));

        let body = request_body(&request);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "And now?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn body_carries_generation_config() {
        let request = GenerateRequest::prompt("m", "say hi")
            .with_modalities(&[Modality::Audio])
            .with_voice("Algenib")
            .json();
        let body = request_body(&request);
        let config = &body["generationConfig"];
        assert_eq!(config["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            config["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Algenib"
        );
        assert_eq!(config["responseMimeType"], "application/json");
    }

    #[test]
    fn parses_text_and_media_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[
            {"text":"Here is "},{"text":"your image"},
            {"inlineData":{"mimeType":"image/png","data":"iVBORw0"}}
        ]},"finishReason":"STOP"}]}"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.text.as_deref(), Some("Here is your image"));
        assert_eq!(response.media[0].mime_type, "image/png");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn skips_thought_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"text":"thinking...","thought":true},{"text":"Answer"}]}}]}"#;
        assert_eq!(parse_response(body).unwrap().text.as_deref(), Some("Answer"));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(parse_response(body), Err(LlmError::Blocked(r)) if r == "SAFETY"));
        assert!(matches!(parse_response("{}"), Err(LlmError::EmptyOutput)));
        assert!(matches!(parse_response("<html>"), Err(LlmError::Json(_))));
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(
            GeminiClient::new(" ", None, DEFAULT_TIMEOUT),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn posts_to_generate_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "Be kind." }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "A list is an ordered collection." }]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key", Some(&server.uri()), DEFAULT_TIMEOUT).unwrap();
        let request = GenerateRequest::prompt("googleai/gemini-2.0-flash", "What is a list?")
            .with_system_instruction("Be kind.");
        let text = client.generate(request).await.unwrap().into_text().unwrap();
        assert_eq!(text, "A list is an ordered collection.");

        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].url.query(), None);
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_api_key() {
        let client = GeminiClient::new(
            "SECRET-KEY-123",
            Some("http://127.0.0.1:1"),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = client
            .generate(GenerateRequest::prompt("gemini-2.0-flash", "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Http(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        let surfaced = crate::error::Error::from(err).to_string();
        assert!(!surfaced.contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new("bad", Some(&server.uri()), DEFAULT_TIMEOUT).unwrap();
        let err = client
            .generate(GenerateRequest::prompt("gemini-2.0-flash", "hi"))
            .await
            .unwrap_err();
        let LlmError::Api { status, message } = err else {
            panic!("expected an API error, got {err:?}");
        };
        assert_eq!(status, 400);
        assert_eq!(message, "API key not valid.");
    }

    #[tokio::test]
    async fn times_out_hung_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "candidates": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            GeminiClient::new("k", Some(&server.uri()), Duration::from_millis(100)).unwrap();
        let err = client
            .generate(GenerateRequest::prompt("gemini-2.0-flash", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
    }
}
