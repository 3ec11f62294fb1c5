//! toolwire CLI: a chat model that can call local tools and MCP server tools.

mod spinner;

use anyhow::{Context, Result};
use clap::Parser;
use spinner::Spinner;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use toolwire_api::OpenAiBackend;
use toolwire_config::{CliOverrides, ToolwireConfig};
use toolwire_core::{Orchestrator, TurnEvent, TurnOutcome};
use toolwire_mcp::SessionManager;
use toolwire_tools::ToolRegistry;
use toolwire_types::{Message, TurnError};

#[derive(Parser)]
#[command(
    name = "toolwire",
    version,
    about = "Chat with a model that can call local and MCP server tools"
)]
struct Cli {
    /// Send a single prompt and print the answer (non-interactive)
    #[arg(short, long)]
    print: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Maximum backend submissions per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// System prompt for the conversation
    #[arg(long)]
    system: Option<String>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = ToolwireConfig::load(CliOverrides {
        api_key: cli.api_key,
        model: cli.model,
        max_iterations: cli.max_iterations,
        system_prompt: cli.system,
    })
    .context("Failed to load configuration")?;

    let backend = OpenAiBackend::new(&config.api_key, &config.base_url, &config.model)
        .context("Failed to create completion backend")?;

    let servers = SessionManager::start(&config.mcp).await;
    for (name, tools) in servers.server_summary() {
        eprintln!("Connected to '{name}' ({tools} tools)");
    }

    let mut registry = ToolRegistry::with_builtins();
    registry.register_all_remote(servers.tools());

    let orchestrator = Orchestrator::new(Arc::new(backend), registry)
        .with_max_iterations(config.max_iterations);

    let result = match cli.print {
        Some(prompt) => print_mode(&orchestrator, &config, &prompt).await,
        None => repl(&orchestrator, &config, &servers).await,
    };

    servers.shutdown().await;
    result
}

async fn print_mode(
    orchestrator: &Orchestrator,
    config: &ToolwireConfig,
    prompt: &str,
) -> Result<()> {
    let mut messages = vec![Message::system(&config.system_prompt), Message::user(prompt)];
    let outcome = run_turn(orchestrator, &mut messages).await?;
    println!("{}", outcome.text);
    eprintln!(
        "Tokens: prompt {}, completion {} ({} iterations)",
        outcome.usage.prompt_tokens, outcome.usage.completion_tokens, outcome.iterations
    );
    Ok(())
}

async fn repl(
    orchestrator: &Orchestrator,
    config: &ToolwireConfig,
    servers: &SessionManager,
) -> Result<()> {
    let mut messages = vec![Message::system(&config.system_prompt)];
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!(
        "toolwire v{} (model: {}, tools: {}, servers: {})",
        env!("CARGO_PKG_VERSION"),
        config.model,
        orchestrator.registry().len(),
        servers.server_count()
    );
    eprintln!("Type your message. Type 'exit' or press Ctrl+D to quit.\n");

    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            eprintln!();
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/help" => {
                print_help();
                continue;
            }
            "/tools" => {
                for name in orchestrator.registry().names() {
                    eprintln!("  {name}");
                }
                continue;
            }
            "/clear" => {
                messages.truncate(1);
                eprintln!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        let checkpoint = messages.len();
        messages.push(Message::user(input));

        match run_turn(orchestrator, &mut messages).await {
            Ok(outcome) => println!("{}\n", outcome.text),
            Err(e) => {
                // Drop the unanswered exchange so the next turn starts clean.
                messages.truncate(checkpoint);
                match e {
                    TurnError::Cancelled => eprintln!("Cancelled."),
                    other => eprintln!("Error: {other}"),
                }
            }
        }
    }

    Ok(())
}

/// Run one turn with a spinner and Ctrl+C cancellation.
async fn run_turn(
    orchestrator: &Orchestrator,
    messages: &mut Vec<Message>,
) -> Result<TurnOutcome, TurnError> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let spinner = Spinner::start();
    let result = orchestrator
        .run(messages, cancel, |event| match event {
            TurnEvent::CompletionStarted { .. } => spinner.show("Thinking..."),
            TurnEvent::ToolStart { name, arguments } => {
                spinner.hide();
                eprintln!("  [tool: {name} {arguments}]");
                spinner.show(format!("Running {name}..."));
            }
            TurnEvent::ToolEnd {
                name,
                output,
                is_error,
            } => {
                spinner.hide();
                if is_error {
                    eprintln!("  [tool {name} failed: {output}]");
                } else {
                    eprintln!("  [tool {name} done: {output}]");
                }
            }
            TurnEvent::Usage(usage) => {
                tracing::debug!(
                    prompt = usage.prompt_tokens,
                    completion = usage.completion_tokens,
                    "turn usage"
                );
            }
            TurnEvent::Done | TurnEvent::Cancelled => spinner.hide(),
        })
        .await;

    spinner.stop().await;
    interrupt.abort();
    result
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  /help     Show this help");
    eprintln!("  /tools    List available tools");
    eprintln!("  /clear    Start a new conversation");
    eprintln!("  exit      Quit (also: quit, Ctrl+D)");
}
