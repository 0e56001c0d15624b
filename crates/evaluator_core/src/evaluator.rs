//! crates/evaluator_core/src/evaluator.rs
//!
//! The evaluation client: sends a document to the grading backend and returns a
//! validated result. Every failure surfaces as `CoreError::EvaluationFailed`.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::{Document, EvaluationResult};
use crate::error::{CoreError, CoreResult};
use crate::ports::{EvaluationPrompt, EvaluationService, PortError};
use crate::prompt::{response_schema, GRADING_INSTRUCTIONS, GRADING_TEMPERATURE};
use crate::validator::validate_response;

#[derive(Clone)]
pub struct Evaluator {
    service: Arc<dyn EvaluationService>,
    schema: Arc<Value>,
}

impl Evaluator {
    pub fn new(service: Arc<dyn EvaluationService>) -> Self {
        Self {
            service,
            schema: Arc::new(response_schema()),
        }
    }

    /// Grades one document. No retries; the caller decides whether to resubmit.
    pub async fn evaluate(&self, document: &Document) -> CoreResult<EvaluationResult> {
        info!(
            "Evaluating {} ({}, {} bytes)",
            document.file_name,
            document.media_type.as_mime(),
            document.bytes.len()
        );

        let prompt = EvaluationPrompt {
            document,
            instructions: GRADING_INSTRUCTIONS,
            response_schema: &self.schema,
            temperature: GRADING_TEMPERATURE,
        };

        let raw = self.service.generate_evaluation(prompt).await.map_err(|e| match e {
            PortError::Configuration(message) => {
                error!("Evaluation service is not configured: {}", message);
                CoreError::EvaluationFailed(message)
            }
            other => {
                error!("Evaluation service call failed: {}", other);
                api_failure(other.to_string())
            }
        })?;

        validate_response(&raw).map_err(|e| {
            error!("Evaluation response rejected: {}", e);
            api_failure(e.to_string())
        })
    }
}

fn api_failure(detail: String) -> CoreError {
    CoreError::EvaluationFailed(format!(
        "Failed to evaluate document. API Error: {detail}"
    ))
}
