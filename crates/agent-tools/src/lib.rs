//! Tool management and execution framework for the web search agent
//!
//! This crate provides a framework for defining and executing tools (functions)
//! that agents can use to perform actions, and the DuckDuckGo web search tool.

pub mod duckduckgo;
pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;

pub use duckduckgo::{DuckDuckGoConfig, DuckDuckGoTool, SearchResult};
