//! Gemini client
//!
//! Calls `POST {base_url}/{model}:generateContent` with the system
//! instruction and the full replayed history. Gemini's `role`/`parts` shapes
//! stay in this file; everything outside sees [`Turn`]s.
//!
//! There is no retry and no request timeout: a failed call is returned to
//! the caller as-is.

use super::{ChatProvider, ChatReply};
use crate::config::LabConfig;
use crate::lab::Turn;
use crate::{LabError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_DETAIL_CHARS: usize = 500;

// ─── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    fn from_turn(turn: &Turn) -> Self {
        Self::text(Some(&turn.role.to_string()), &turn.content)
    }

    fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
    }
}

// ─── Client ─────────────────────────────────────────────────────────

/// Gemini chat client
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client from config. The credential is read from the
    /// environment now but only checked when a message is sent.
    pub fn new(config: &LabConfig) -> Self {
        let client = Client::builder()
            .user_agent(concat!("promptlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        let api_key = config.api_key();
        info!(
            "Gemini client: model={}, base_url={}, credential={}",
            config.model,
            config.base_url,
            if api_key.is_some() { "set" } else { "missing" }
        );

        Self {
            client,
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full `generateContent` URL for the configured model
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model = self.model.trim_start_matches('/');
        if model.starts_with("models/") || model.starts_with("tunedModels/") {
            format!("{base}/{model}:generateContent")
        } else {
            format!("{base}/models/{model}:generateContent")
        }
    }

    fn build_request(
        system_instruction: &str,
        history: &[Turn],
        message: &str,
    ) -> GenerateContentRequest {
        let mut contents: Vec<Content> = history.iter().map(Content::from_turn).collect();
        contents.push(Content::text(Some("user"), message));
        GenerateContentRequest {
            system_instruction: Content::text(None, system_instruction),
            contents,
        }
    }

    /// Pull the reply text out of a `generateContent` response body.
    fn parse_reply(body: &str) -> Result<String> {
        let response: GenerateContentResponse = serde_json::from_str(body)?;

        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(LabError::Provider(format!("reply blocked: {reason}")));
        };

        let text = candidate
            .content
            .as_ref()
            .map(Content::joined_text)
            .unwrap_or_default();
        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "UNKNOWN".to_string());
            return Err(LabError::Provider(format!(
                "reply has no text (finish reason: {reason})"
            )));
        }

        Ok(text)
    }

    async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = Self::extract_error_detail(&body);
        let detail = Self::truncate_error_detail(&detail, MAX_ERROR_DETAIL_CHARS);
        if !detail.is_empty() {
            return Err(LabError::Provider(format!("API error {status}: {detail}")));
        }
        Err(LabError::Provider(format!("API error {status}")))
    }

    fn extract_error_detail(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(msg) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
            {
                return msg.to_string();
            }
            if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }

        trimmed.to_string()
    }

    fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
        if detail.chars().count() <= max_chars {
            return detail.to_string();
        }

        let mut truncated = detail.chars().take(max_chars).collect::<String>();
        truncated.push_str("... [truncated]");
        truncated
    }

    fn map_reqwest_error(e: reqwest::Error) -> LabError {
        if e.is_timeout() {
            LabError::Network(format!("timeout: {e}"))
        } else if e.is_connect() {
            LabError::Network(format!("connect: {e}"))
        } else {
            LabError::Network(e.to_string())
        }
    }
}

impl ChatProvider for GeminiClient {
    async fn send_message(
        &self,
        system_instruction: &str,
        history: &[Turn],
        message: &str,
    ) -> Result<ChatReply> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LabError::MissingCredential(self.api_key_env.clone()))?;

        let request = Self::build_request(system_instruction, history, message);
        debug!(
            "Sending to {}: system={} chars, history={} turns, message={} chars",
            self.model,
            system_instruction.len(),
            history.len(),
            message.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        let response = Self::check_response_status(response).await?;
        let body = response.text().await.map_err(Self::map_reqwest_error)?;
        let text = Self::parse_reply(&body)?;
        debug!("Reply from {}: {} chars", self.model, text.len());

        Ok(ChatReply::new(history, message, text))
    }
}
