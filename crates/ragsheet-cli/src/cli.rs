use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    #[allow(dead_code)]
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

#[derive(Parser)]
#[command(name = "ragsheet")]
#[command(version, about = "Ragsheet - chat with your spreadsheet knowledge base")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL (overrides the config file)
    #[arg(long, global = true, env = "RAGSHEET_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session
    Chat(ChatArgs),

    /// Ask a single question and print the answer
    Ask(AskArgs),

    /// Knowledge base file management
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Show server and knowledge base status
    Health(HealthArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Send messages even when the server reports it is not ready
    #[arg(long)]
    pub skip_health_check: bool,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question text
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Do not check server readiness before asking
    #[arg(long)]
    pub skip_health_check: bool,
}

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// List files in the knowledge base
    List,

    /// Upload a spreadsheet (.xlsx or .xls, at most 10 MiB)
    Upload {
        /// Path to the spreadsheet
        path: PathBuf,
    },

    /// Delete a file from the knowledge base
    Delete {
        /// File name as shown by `files list`
        name: String,
    },

    /// Rebuild the vector store from all files
    Rebuild,
}

#[derive(Args, Debug, Default)]
pub struct HealthArgs {
    /// Keep polling and print every status change
    #[arg(long)]
    pub watch: bool,

    /// Poll interval in seconds for --watch (defaults to the config value)
    #[arg(long)]
    pub interval: Option<u64>,
}
