//! services/api/src/lib.rs
//!
//! The `api` service: storage and LLM adapters, configuration and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
