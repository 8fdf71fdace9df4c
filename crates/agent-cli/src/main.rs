//! Web search agent CLI
//!
//! Asks a Gemini model one question, letting it search the web with
//! DuckDuckGo, and streams the answer to stdout.
//!
//! # Usage
//!
//! ```bash
//! export GOOGLE_API_KEY="..."
//! cargo run --bin web-search-agent
//! cargo run --bin web-search-agent -- --prompt "Latest Rust release?" --plain
//! ```

use agent_cli::{
    AgentBootstrap, BootstrapRequest, DEFAULT_MODEL, DEFAULT_PROMPT, GeminiConnector,
    LiveRuntimeConnector, exit_status,
};
use agent_llm::providers::gemini::API_KEY_ENV_VARS;
use agent_runtime::OutputFormat;
use anyhow::Context;
use clap::Parser;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "web-search-agent", version)]
#[command(about = "Ask a Gemini-backed agent a question it can answer by searching the web", long_about = None)]
struct Args {
    /// Question to ask
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Gemini model identifier
    #[arg(short, long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Print the answer once it is complete instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Ask for a plain-text answer instead of markdown
    #[arg(long)]
    plain: bool,

    /// Do not print the tool calls the agent makes
    #[arg(long)]
    hide_tool_calls: bool,

    /// Always fetch this many search results
    #[arg(long, value_name = "N")]
    max_results: Option<usize>,
}

impl Args {
    /// `terminal` tells whether stdout is a terminal; markdown is only styled there
    fn into_request(self, credential: String, terminal: bool) -> BootstrapRequest {
        let output_format = if self.plain {
            OutputFormat::Plain
        } else {
            OutputFormat::Markdown
        };
        BootstrapRequest {
            model_id: self.model,
            stream: !self.no_stream,
            output_format,
            show_tool_calls: !self.hide_tool_calls,
            render_markdown: terminal && output_format == OutputFormat::Markdown,
            max_results: self.max_results,
            ..BootstrapRequest::new(credential, self.prompt)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let credential = agent_utils::first_env(&API_KEY_ENV_VARS)
        .map_err(|e| agent_core::Error::Configuration(e.to_string()))?;
    let mut stdout = io::stdout();
    let request = args.into_request(credential, stdout.is_terminal());

    let bootstrap = AgentBootstrap::new(GeminiConnector::from_env(), LiveRuntimeConnector);
    bootstrap.run(&request, &mut stdout).await?;
    writeln!(stdout).context("failed to write to stdout")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    agent_utils::init_tracing();

    let args = Args::parse();
    let result = run(args).await;
    if let Err(e) = &result {
        eprintln!("Error: {e:#}");
    }
    ExitCode::from(exit_status(&result))
}
