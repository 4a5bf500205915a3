//! Ratpi 命令行入口
//!
//! 子命令：agent（执行任务，默认由 Supervisor 监督）、tools（打印工具目录）、context（打印环境快照）。

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use ratpi::config::{load_config, AppConfig};
use ratpi::core::{AgentError, TaskScheduler, UserWait};
use ratpi::llm::create_llm_from_config;
use ratpi::react::{OperatorHandler, Supervisor, Worker};
use ratpi::tools::{ContextProvider, ToolExecutor, ToolRegistry};
use ratpi::ui::{narrate, Spinner, StdTerminal, Terminal};

#[derive(Parser, Debug)]
#[command(name = "ratpi", version, about = "A terminal coding agent with a supervising reviewer")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 打开调试日志（等同 RATPI_VERBOSE=true）
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent on a task
    Agent {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Let the operator review the result instead of the supervisor
        #[arg(long)]
        no_supervisor: bool,
    },
    /// Print the tool catalog
    Tools,
    /// Print the environment snapshot returned by getContext
    Context,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    ratpi::observability::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ratpi] {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = load_config(cli.config.clone()).context("Failed to load configuration")?;
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;

    match cli.command {
        Command::Tools => {
            println!("{}", ToolRegistry::standard().to_schema_json());
            Ok(())
        }
        Command::Context => {
            let ctx = ContextProvider::new(&cwd, cfg.tools.env_whitelist.clone()).snapshot();
            println!("{}", serde_json::to_string_pretty(&ctx)?);
            Ok(())
        }
        Command::Agent {
            task,
            no_supervisor,
        } => run_agent(&cfg, cwd, &task.join(" "), no_supervisor).await,
    }
}

async fn run_agent(cfg: &AppConfig, cwd: PathBuf, goal: &str, no_supervisor: bool) -> anyhow::Result<()> {
    let llm = match create_llm_from_config(cfg) {
        Ok(llm) => llm,
        Err(e @ AgentError::MissingCredential(_)) => {
            anyhow::bail!("{e}. Set it in your environment and try again.")
        }
        Err(e) => return Err(e).context("Failed to create LLM client"),
    };

    let spinner = Spinner::new();
    let terminal: Arc<dyn Terminal> = Arc::new(StdTerminal::new(spinner.clone()));
    let executor = Arc::new(ToolExecutor::new(
        &cwd,
        Arc::new(TaskScheduler::new()),
        UserWait::new(),
        terminal.clone(),
        &cfg.tools,
    ));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let narrator = tokio::spawn(narrate(event_rx, spinner.clone()));

    let worker = Worker::new(llm.clone(), executor, spinner)
        .with_config(&cfg.agent)
        .with_events(event_tx.clone());

    if no_supervisor || !cfg.supervisor.enabled {
        drop(event_tx);
        let mut handler = OperatorHandler::new(terminal);
        let result = worker.run(goal, &mut handler).await;
        drop(worker);
        let _ = narrator.await;
        result.context("Agent execution failed")?;
    } else {
        let mut supervisor = Supervisor::new(llm, worker)
            .with_config(&cfg.supervisor)
            .with_events(event_tx);
        let outcome = supervisor.execute_task(goal).await;
        drop(supervisor);
        let _ = narrator.await;
        println!("{outcome}");
    }
    Ok(())
}
