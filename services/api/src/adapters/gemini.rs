//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the grading LLM.
//! It implements the `EvaluationService` port from the `core` crate by calling
//! the Gemini `generateContent` REST endpoint with the document inlined.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use evaluator_core::ports::{EvaluationPrompt, EvaluationService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

pub const MISSING_KEY_MESSAGE: &str = "API Key is missing. Please configure GEMINI_API_KEY.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `EvaluationService` using Gemini structured output.
#[derive(Clone)]
pub struct GeminiEvaluationAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiEvaluationAdapter {
    /// Creates a new `GeminiEvaluationAdapter`. The key is checked per call so a
    /// misconfigured deployment still starts.
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Instruction text first, then the document as base64 inline data.
fn build_request<'a>(prompt: &EvaluationPrompt<'a>) -> GenerateContentRequest<'a> {
    let document = prompt.document;
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: prompt.instructions,
                },
                Part::Inline {
                    inline_data: InlineData {
                        mime_type: document.media_type.as_mime(),
                        data: STANDARD.encode(&document.bytes),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: prompt.response_schema,
            temperature: prompt.temperature,
        },
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> PortResult<String> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        PortError::Unexpected("Evaluation LLM returned no candidates in its response.".to_string())
    })?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(PortError::Unexpected(format!(
            "Evaluation LLM response contained no text content (finish reason: {}).",
            reason
        )));
    }
    Ok(text)
}

/// Pulls the human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Timeouts get their own message; both kinds end the evaluation as a failure.
fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        error!("Evaluation LLM request timed out: {}", e);
        PortError::Unexpected(format!("Request timed out: {}", e))
    } else {
        PortError::Unexpected(e.to_string())
    }
}

//=========================================================================================
// `EvaluationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EvaluationService for GeminiEvaluationAdapter {
    async fn generate_evaluation(&self, prompt: EvaluationPrompt<'_>) -> PortResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PortError::Configuration(MISSING_KEY_MESSAGE.to_string()))?;

        let body = build_request(&prompt);
        debug!("Calling {} for {}", self.model, prompt.document.file_name);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(response body unreadable: {})", e));
            let message = error_message(&text);
            error!("Evaluation LLM returned {}: {}", status, message);
            return Err(PortError::Unexpected(format!("{} {}", status.as_u16(), message)));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(transport_error)?;

        extract_text(parsed)
    }
}
