//! depq CLI - run a manifest of shell commands in dependency order.

mod item;
mod manifest;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use depq_progress::{ConsoleProgress, ProgressSink};
use depq_queue::ExecutionQueue;
use tracing::{info, Level};

use crate::item::CommandItem;
use crate::manifest::Manifest;

#[derive(Parser)]
#[command(name = "depq")]
#[command(about = "Dependency-ordered parallel task runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tasks in a manifest
    Run {
        /// Path to the manifest file
        manifest: PathBuf,
        /// Max concurrent tasks (overrides the manifest)
        #[arg(long)]
        jobs: Option<usize>,
        /// Suppress the progress line
        #[arg(long)]
        quiet: bool,
    },
    /// Validate a manifest without running anything
    Check {
        /// Path to the manifest file
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            manifest,
            jobs,
            quiet,
        } => {
            let manifest = Manifest::load(&manifest)?;
            let jobs = jobs.unwrap_or(manifest.jobs);
            let progress: Option<Arc<dyn ProgressSink>> = if quiet {
                None
            } else {
                Some(Arc::new(ConsoleProgress::new("Running")))
            };

            let mut queue = ExecutionQueue::new(jobs, progress);
            for task in manifest.tasks {
                queue.enqueue(Box::new(CommandItem::new(task)))?;
            }

            // Ctrl-C drains in-flight tasks instead of killing them mid-write.
            let handle = queue.handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    handle.cancel();
                }
            });

            match queue.flush().await {
                Ok(()) => {
                    info!("completed {} task(s)", queue.completed().len());
                }
                Err(err) => {
                    eprintln!("error: {err}");
                    let discarded = queue.discarded();
                    if !discarded.is_empty() {
                        eprintln!("never started: {}", discarded.join(", "));
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { manifest } => {
            let manifest = Manifest::load(&manifest)?;
            let issues = manifest.validate();
            if issues.is_empty() {
                println!("ok: {} task(s)", manifest.tasks.len());
            } else {
                for issue in &issues {
                    eprintln!("error: {issue}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
