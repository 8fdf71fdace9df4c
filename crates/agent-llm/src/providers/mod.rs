//! Concrete LLM provider implementations
//!
//! This module contains implementations of the LLMProvider trait for
//! hosted LLM services.

pub mod gemini;
mod sse;

pub use gemini::{GeminiConfig, GeminiProvider};
