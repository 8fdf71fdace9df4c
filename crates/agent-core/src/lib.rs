//! Core abstractions for the web search agent
//!
//! This crate defines the error type and the credential shared by the LLM
//! client, the tool framework and the agent runtime.

pub mod error;
pub mod secret;

pub use error::{Error, Result};
pub use secret::Credential;
