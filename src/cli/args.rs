//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, engine::EngineCommands, form::FormCommands, init::InitArgs,
    schema::SchemaCommands, workflow::WorkflowCommands,
};

#[derive(Parser)]
#[command(name = "tfm")]
#[command(author, version, about = "Tessera Forms")]
#[command(long_about = "Register XML forms and their rendering engine templates in a plain-file content repository.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .tfm/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new TFM project
    Init(InitArgs),

    /// Create, list and inspect XML forms
    #[command(subcommand)]
    Form(FormCommands),

    /// Inspect XML Schema files
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Workflows available as a form's default workflow
    #[command(subcommand)]
    Workflow(WorkflowCommands),

    /// Rendering engines available to templates
    #[command(subcommand)]
    Engine(EngineCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// Markdown tables
    Md,
    /// Just names, one per line
    Id,
}
