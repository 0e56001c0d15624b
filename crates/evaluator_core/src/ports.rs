//! crates/evaluator_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage technologies or the grading backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Document;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The adapter is missing configuration it needs (e.g. an API key).
    #[error("{0}")]
    Configuration(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A string key-value store with get/set/remove semantics.
///
/// Backs both the durable credential store and the tab-scoped session store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;
}

/// Everything the grading backend needs for a single call.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationPrompt<'a> {
    pub document: &'a Document,
    pub instructions: &'a str,
    pub response_schema: &'a Value,
    pub temperature: f32,
}

#[async_trait]
pub trait EvaluationService: Send + Sync {
    /// Sends the document and instructions to the backend and returns the raw
    /// structured text it produced.
    async fn generate_evaluation(&self, prompt: EvaluationPrompt<'_>) -> PortResult<String>;
}
