use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use pm_workflows::config::{get_settings, ReviewMode, Settings};
use pm_workflows::telemetry::{init_telemetry, span_duration, TelemetryConfig};
use pm_workflows::workflow::TaskContext;
use pm_workflows::{
    processes, AutoReviewer, ConsoleReviewer, Executor, Reviewer, RetryingExecutor, StubExecutor,
    WorkflowEngine,
};

/// Run and inspect product-management processes
#[derive(Parser, Debug)]
#[command(name = "pm-workflows", version, about)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered processes
    List,

    /// Print the tasks and output contracts of a process as JSON
    Describe {
        /// Process identifier or slug
        process: String,
    },

    /// Run a process against the stub executor
    DryRun {
        /// Process identifier or slug
        process: String,

        /// JSON file with process inputs
        #[arg(long, conflicts_with = "input_json")]
        inputs: Option<PathBuf>,

        /// Process inputs as inline JSON
        #[arg(long)]
        input_json: Option<String>,

        /// Approve every breakpoint without asking
        #[arg(long)]
        auto_approve: bool,
    },
}

fn read_inputs(inputs: Option<PathBuf>, input_json: Option<String>) -> Result<Value> {
    match (inputs, input_json) {
        (Some(path), _) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read inputs from {}", path.display()))?;
            serde_json::from_str(&raw).context("Inputs file is not valid JSON")
        }
        (None, Some(raw)) => serde_json::from_str(&raw).context("--input-json is not valid JSON"),
        (None, None) => Ok(json!({})),
    }
}

fn list() {
    for process in processes::catalog() {
        println!(
            "{}  {} ({} tasks)",
            process.id().bold(),
            process.description(),
            process.tasks().len()
        );
    }
}

fn describe(id: &str, settings: &Settings) -> Result<()> {
    let process = processes::find(id)?;
    let tasks: Vec<Value> = process
        .tasks()
        .iter()
        .map(|task| {
            let descriptor = task.build(
                &json!({}),
                &TaskContext::with_effect_id(&settings.engine.tasks_dir, "<effectId>"),
            );
            json!({
                "name": descriptor.name,
                "title": descriptor.title,
                "role": descriptor.agent.role,
                "instructions": descriptor.agent.instructions,
                "labels": descriptor.labels,
                "outputSchema": descriptor.agent.output_schema,
            })
        })
        .collect();

    let description = json!({
        "id": process.id(),
        "description": process.description(),
        "tasks": tasks,
    });
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

async fn dry_run(
    id: &str,
    inputs: Value,
    auto_approve: bool,
    settings: Settings,
) -> Result<()> {
    let process = processes::find(id)?;

    let mut executor: Arc<dyn Executor> = Arc::new(StubExecutor::new());
    if settings.executor.retry.max_attempts > 1 || settings.executor.timeout_secs.is_some() {
        let retrying = RetryingExecutor::new(executor, settings.executor.retry.clone());
        executor = match settings.executor.timeout() {
            Some(limit) => Arc::new(retrying.with_timeout(limit)),
            None => Arc::new(retrying),
        };
    }

    let reviewer: Arc<dyn Reviewer> = if auto_approve || settings.review.mode == ReviewMode::Auto {
        Arc::new(AutoReviewer::new())
    } else {
        Arc::new(ConsoleReviewer::new())
    };

    let engine = WorkflowEngine::new(executor, reviewer).with_settings(settings.engine.clone());
    info!("Dry run of {} on engine {}", process.id(), engine.id());

    let timer = span_duration("dry_run");
    let run = engine.run(process.as_ref(), inputs).await?;
    let elapsed_ms = timer.elapsed_ms();

    if let Some(failure) = run.outcome.gate_failure() {
        eprintln!(
            "{} {} ({})",
            "Halted at".yellow().bold(),
            failure.phase,
            failure.error
        );
        eprintln!("{} {}", "Recommendation:".yellow(), failure.recommendation);
    } else {
        eprintln!(
            "{} {} tasks, {} artifacts, {} reviews in {:.0} ms",
            "Completed:".green().bold(),
            run.task_count,
            run.artifacts.len(),
            run.reviews.len(),
            elapsed_ms
        );
    }
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = get_settings(cli.config.as_deref())?;

    init_telemetry(TelemetryConfig {
        log_level: settings.logger.level.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    match cli.command {
        Command::List => list(),
        Command::Describe { process } => describe(&process, &settings)?,
        Command::DryRun {
            process,
            inputs,
            input_json,
            auto_approve,
        } => {
            let inputs = read_inputs(inputs, input_json)?;
            dry_run(&process, inputs, auto_approve, settings).await?;
        }
    }

    Ok(())
}
