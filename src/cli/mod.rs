use clap::Parser;

/// GitNexus — build a code knowledge graph from a repository (SPEC_FULL.md
/// §12 "minimal demo binary"). Deliberately thin: this crate's product
/// surface is the library's orchestrator, not a CLI.
#[derive(Parser)]
#[command(name = "gitnexus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory of the repository to ingest.
    pub path: String,

    /// Write the resulting graph snapshot as newline-delimited JSON here.
    #[arg(short, long)]
    pub out: Option<String>,

    /// Path to a JSON pipeline config (see `PipelineConfig`); defaults used
    /// when omitted.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}
