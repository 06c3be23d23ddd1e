//! GitNexus CLI — drives the ingestion pipeline over a path argument and
//! prints a summary (SPEC_FULL.md §12 "minimal demo binary").

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gitnexus::cli::Cli;
use gitnexus::{FsScanner, JsonlGraphSink, Orchestrator, PipelineConfig, ProgressReporter, WorkerPool};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {path}"))?;
            PipelineConfig::from_json(&raw).with_context(|| format!("parsing config file {path}"))?
        }
        None => PipelineConfig::default(),
    };

    let root = Path::new(&cli.path);
    let out_path = cli.out.clone().unwrap_or_else(|| "gitnexus-graph.jsonl".to_string());

    let fs = Arc::new(FsScanner::new(config.max_file_size_bytes));
    let extraction = Arc::new(WorkerPool::new(&config));
    let sink = Arc::new(JsonlGraphSink::new(&out_path));
    let orchestrator = Orchestrator::new(fs, extraction, sink, config);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let progress = ProgressReporter::new(tx);
    let progress_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            info!(phase = ?event.phase, percent = event.percent, message = %event.message, "progress");
        }
    });

    let outcome = orchestrator.run(root, &progress).await?;
    drop(progress);
    let _ = progress_task.await;

    println!("GitNexus ingestion complete");
    println!("============================");
    println!("Files scanned:    {}", outcome.stats.files_scanned);
    println!("Files parsed:     {}", outcome.stats.files_parsed);
    println!("Definitions:      {}", outcome.stats.definitions);
    println!("Imports resolved: {}", outcome.stats.imports_resolved);
    println!("Calls resolved:   {}", outcome.stats.calls_resolved);
    println!("Heritage resolved:{}", outcome.stats.heritage_resolved);
    println!("Communities:      {}", outcome.stats.communities);
    println!("Processes:        {}", outcome.stats.processes);
    println!("Non-fatal errors: {}", outcome.stats.non_fatal_errors);
    println!(
        "Graph: {} nodes, {} relationships -> {}",
        outcome.snapshot.nodes.len(),
        outcome.snapshot.relationships.len(),
        out_path
    );

    Ok(())
}
