use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncWriteExt as _, BufReader, Stdin};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use react_agent::{
    next_input_line, project_toolkit, stdin_lines, Agent, AgentConfig, AgentHook, AutoApprove,
    ConfirmationHandler, LoopOutcome, OpenAiClient, ParsedAction, SharedLines, StdinConfirmation,
};

#[derive(Parser)]
#[command(name = "react-agent")]
#[command(about = "Reason-then-act agent that works inside a project directory", long_about = None)]
struct Cli {
    #[arg(help = "Project directory the tools operate on")]
    project_directory: PathBuf,

    #[arg(short, long, help = "TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Model to use (overrides config)")]
    model: Option<String>,

    #[arg(
        long,
        value_parser = parse_max_steps,
        help = "Stop after this many model turns"
    )]
    max_steps: Option<usize>,

    #[arg(short, long, help = "Run terminal commands without asking")]
    yes: bool,
}

fn parse_max_steps(raw: &str) -> std::result::Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".into()),
        Ok(steps) => Ok(steps),
        Err(err) => Err(err.to_string()),
    }
}

/// Prints loop events the way an operator expects to follow them.
struct ConsoleHook;

#[async_trait]
impl AgentHook for ConsoleHook {
    async fn on_thought(&self, thought: &str) -> react_agent::Result<()> {
        println!("\n\n💭 Thought: {}", thought.trim());
        Ok(())
    }

    async fn before_tool_call(&self, action: &ParsedAction) -> react_agent::Result<()> {
        println!("\n\n🔧 Action: {action}");
        Ok(())
    }

    async fn after_tool_result(
        &self,
        _action: &ParsedAction,
        observation: &str,
    ) -> react_agent::Result<()> {
        println!("\n\n🔍 Observation: {observation}");
        Ok(())
    }

    async fn on_final_answer(&self, answer: &str) -> react_agent::Result<()> {
        println!("\n\n✅ Final Answer: {answer}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "react_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if !cli.project_directory.is_dir() {
        bail!(
            "project directory does not exist: {}",
            cli.project_directory.display()
        );
    }
    let project_directory = cli
        .project_directory
        .canonicalize()
        .with_context(|| format!("cannot resolve {}", cli.project_directory.display()))?;

    let mut config = AgentConfig::from_env_or_file(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model.model = model;
    }
    if let Some(max_steps) = cli.max_steps {
        config.run.max_steps = Some(max_steps);
    }

    let model = Arc::new(OpenAiClient::from_config(&config.model)?);
    let tools = project_toolkit(&project_directory, &config.tools)?;
    let input = stdin_lines();
    let confirmation: Arc<dyn ConfirmationHandler> = if cli.yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(StdinConfirmation::new(input.clone()))
    };

    let mut agent = Agent::new(model)
        .with_tools(tools)
        .with_project_directory(&project_directory)
        .with_hook(Arc::new(ConsoleHook))
        .with_confirmation_handler(confirmation);
    if let Some(max_steps) = config.run.max_steps {
        agent = agent.with_max_steps(max_steps);
    }

    let task = read_task(&input).await?;
    if task.is_empty() {
        bail!("no task given");
    }
    tracing::info!(
        model = %config.model.model,
        project = %project_directory.display(),
        command_timeout_secs = ?config.tools.command_timeout_secs,
        "starting agent"
    );

    match agent.run(task).await? {
        // Printed by ConsoleHook.
        LoopOutcome::Finished(_) => {}
        LoopOutcome::Cancelled(reason) => {
            println!("\n\n{reason}");
        }
        LoopOutcome::ProtocolViolation(reason) => {
            bail!("model broke the reply protocol: {reason}");
        }
    }

    Ok(())
}

async fn read_task(input: &SharedLines<BufReader<Stdin>>) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter a task: ").await?;
    stdout.flush().await?;

    let line = next_input_line(input)
        .await
        .context("failed to read task from stdin")?;
    Ok(line.unwrap_or_default().trim().to_string())
}
