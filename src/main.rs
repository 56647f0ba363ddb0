#![forbid(unsafe_code)]

//! `agent-bridge`: runs one prompt against an ACP agent from the terminal.
//!
//! Loads configuration, resolves the agent, and hands off to the session
//! orchestrator with a stderr progress line and a `dialoguer` prompt. The
//! agent's reply text is printed to stdout when the turn completes.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_bridge::agents::{agent_table, resolve_agent};
use agent_bridge::operator::terminal::{TerminalDisplay, TerminalPrompt};
use agent_bridge::orchestrator::{run_session, SessionOutcome, SessionRequest};
use agent_bridge::runtime::run_blocking;
use agent_bridge::{AppError, GlobalConfig, Result};

/// Exit status for a cancelled session, as for SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-bridge", about = "Drive ACP coding agents from the terminal", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one prompt turn against an agent.
    Run(RunArgs),
    /// List the known agents and their launch commands.
    Agents,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Agent name; defaults to `default_agent` from the config.
    #[arg(long)]
    agent: Option<String>,

    /// Working directory for the agent; defaults to the current directory.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Prompt text.
    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    prompt: Option<String>,

    /// Read the prompt from a file.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Attach a configured MCP server by name. Repeatable.
    #[arg(long = "mcp", value_name = "NAME")]
    mcp: Vec<String>,

    /// Expected number of external tool calls, shown as a ratio.
    #[arg(long)]
    expect_tools: Option<usize>,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let outcome = run_blocking(run(args)).and_then(std::convert::identity);

    match outcome {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "agent-bridge failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    info!("configuration loaded");

    match args.command {
        Command::Agents => {
            for (name, command) in agent_table(&config.agents) {
                println!("{name:<10} {command}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run(run_args) => run_prompt(&config, run_args).await,
    }
}

async fn run_prompt(config: &GlobalConfig, args: RunArgs) -> Result<ExitCode> {
    let agent_name = args.agent.as_deref().unwrap_or(&config.default_agent);
    let agent = resolve_agent(agent_name, &config.agents)?;

    let prompt = match (args.prompt, args.prompt_file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path).map_err(|err| {
            AppError::Config(format!("cannot read prompt file {}: {err}", path.display()))
        })?,
        (None, None) => return Err(AppError::Config("a prompt is required".into())),
    };

    let cwd = match args.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let request = SessionRequest {
        agent,
        cwd,
        prompt,
        mcp_servers: config.mcp_descriptors(&args.mcp)?,
        initialize_timeout: config.initialize_timeout(),
        prompt_timeout: config.prompt_timeout(),
        log_stderr: config.log_agent_stderr,
        expected_external_calls: args.expect_tools,
    };

    let outcome = run_session(
        request,
        Arc::new(TerminalDisplay::new()),
        Arc::new(TerminalPrompt),
    )
    .await?;

    Ok(match outcome {
        SessionOutcome::Completed { agent_message, .. } => {
            if !agent_message.is_empty() {
                println!("{agent_message}");
            }
            ExitCode::SUCCESS
        }
        SessionOutcome::Cancelled { .. } => ExitCode::from(EXIT_CANCELLED),
    })
}

/// Initialise tracing on stderr. The default level is `warn` so log lines do
/// not fight the progress display; `RUST_LOG` overrides it.
fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
