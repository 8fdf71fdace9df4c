//! Web search agent
//!
//! Library half of the `web-search-agent` binary: the [`bootstrap`] module
//! assembles an agent configuration, connects the model, constructs the
//! runtime and issues the prompt. All of it is reachable through trait seams
//! so it can run against test doubles without network access.

pub mod bootstrap;

pub use bootstrap::{
    AGENT_NAME, AgentBootstrap, BootstrapRequest, DEFAULT_MODEL, DEFAULT_PROMPT, GeminiConnector,
    LiveRuntimeConnector, ModelConnector, RuntimeConnector, exit_status,
};
