mod config;
mod input;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nars_core::{Channel, Memory, Payload, StopHandle, TraceEvent, export_json};
use tokio_util::sync::CancellationToken;

use crate::input::Step;

#[derive(Parser)]
#[command(name = "nars", about = "Drive the nars attention core from task scripts")]
struct Cli {
    /// TOML config file (defaults to $NARS_CONFIG, then built-in values)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible runs, overriding the config file
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a task script to memory and run the reasoning cycle
    Run {
        /// Script file: one task or cycle count per line
        input: PathBuf,

        /// Cycles to run after the script is consumed
        #[arg(long, default_value_t = 100)]
        cycles: usize,

        /// Write the trace as JSON to this file
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },

    /// Parse a task script without running it
    Check {
        /// Script file
        input: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Run {
            input,
            cycles,
            trace_out,
        } => cmd_run(&cli, input, *cycles, trace_out.as_deref()).await,
        Commands::Check { input } => cmd_check(input),
        Commands::Config => cmd_config(&cli),
    }
}

fn read_script(path: &Path) -> Result<Vec<Step>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    input::parse_script(&text).with_context(|| format!("failed to parse {}", path.display()))
}

async fn cmd_run(cli: &Cli, path: &Path, cycles: usize, trace_out: Option<&Path>) -> Result<()> {
    let config = config::load(cli.config.as_deref(), cli.seed)?;
    let script = read_script(path)?;
    let mut memory = Memory::new(config).context("failed to build memory")?;

    let done = CancellationToken::new();
    let watcher = tokio::spawn(stop_on_ctrl_c(memory.stop_handle(), done.clone()));

    // the cycle never awaits, so it gets a blocking thread of its own
    let memory = tokio::task::spawn_blocking(move || {
        run_script(&mut memory, script, cycles);
        memory
    })
    .await
    .context("reasoning thread panicked")?;
    done.cancel();
    let _ = watcher.await;

    let trace = memory.trace();
    for event in trace.events(..) {
        if let Some(line) = render(&event) {
            println!("{line}");
        }
    }
    println!(
        "cycles: {}, concepts: {}, tasks: {}",
        memory.time(),
        memory.concept_count(),
        memory.task_count()
    );

    if let Some(out) = trace_out {
        let json = export_json(&trace.snapshot(..)).context("failed to serialize trace")?;
        std::fs::write(out, &json).with_context(|| format!("failed to write {}", out.display()))?;
        println!("trace written to {}", out.display());
    }
    Ok(())
}

fn run_script(memory: &mut Memory, script: Vec<Step>, cycles: usize) {
    let stop = memory.stop_handle();
    for step in script {
        if stop.is_stopped() {
            break;
        }
        match step {
            Step::Input(task) => {
                memory.input_task(task);
            }
            Step::Run(n) => {
                memory.run(n);
            }
        }
    }
    memory.run(cycles);
}

async fn stop_on_ctrl_c(stop: StopHandle, done: CancellationToken) {
    tokio::select! {
        _ = done.cancelled() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("failed to listen for ctrl-c: {e}");
                return;
            }
            tracing::info!("ctrl-c received, stopping after the current cycle");
            stop.stop();
        }
    }
}

/// Console line for the events a user cares about.
fn render(event: &TraceEvent) -> Option<String> {
    let tag = match event.channel {
        Channel::Input => "IN",
        Channel::Output => "OUT",
        Channel::Execution => "EXE",
        Channel::Added | Channel::Removed => return None,
    };
    let body = match &event.payload {
        Payload::Task(task) => task.to_string(),
        Payload::Signal(parts) => parts.join(" "),
    };
    Some(format!("{:>5} {tag}: {body}", event.time))
}

fn cmd_check(path: &Path) -> Result<()> {
    let script = read_script(path)?;
    let tasks = script.iter().filter(|s| matches!(s, Step::Input(_))).count();
    let cycles: usize = script
        .iter()
        .map(|s| match s {
            Step::Run(n) => *n,
            Step::Input(_) => 0,
        })
        .sum();
    println!("{}: {tasks} tasks, {cycles} scripted cycles", path.display());
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref(), cli.seed)?;
    let text = toml::to_string_pretty(&config).context("failed to render config")?;
    print!("{text}");
    Ok(())
}
