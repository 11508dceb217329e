//! CLI commands implementation.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "veri")]
#[command(about = "URL content acquisition and AI analysis system")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, database, and built-in prompts
    Init,

    /// Analyze a URL
    Process {
        /// URL to analyze
        url: String,
        /// User to attribute the analysis to
        #[arg(short, long)]
        user: Option<String>,
        /// Output language
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Clear any existing analysis and regenerate
        #[arg(short, long)]
        force: bool,
        /// Analyze stored text only; never fetch
        #[arg(long)]
        no_fetch: bool,
    },

    /// Show a content item's analysis
    Show {
        /// Content ID
        content_id: String,
        /// Analysis language
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Show one section only (e.g. overview, truth_check)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Show the domain credibility table
    Domains {
        /// Limit number of rows
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Manage analysis prompt templates
    Prompts {
        #[command(subcommand)]
        command: PromptCommands,
    },

    /// Start the API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:3030)
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum PromptCommands {
    /// List stored prompts with their versions
    List,
    /// Print one prompt template
    Show {
        /// Section key (e.g. overview, truth_check, tone_detection)
        section: String,
    },
    /// Install a new version of a prompt from a TOML file
    Set {
        /// Section key to update
        section: String,
        /// TOML file with the fields to change
        file: PathBuf,
    },
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = crate::config::Config::load(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Process { url, user, language, force, no_fetch } => {
            commands::cmd_process(&config, &url, user.as_deref(), &language, force, no_fetch).await
        }
        Commands::Show { content_id, language, section } => {
            commands::cmd_show(&config, &content_id, &language, section.as_deref())
        }
        Commands::Domains { limit } => commands::cmd_domains(&config, limit),
        Commands::Prompts { command } => match command {
            PromptCommands::List => commands::cmd_prompts_list(&config),
            PromptCommands::Show { section } => commands::cmd_prompts_show(&config, &section),
            PromptCommands::Set { section, file } => {
                commands::cmd_prompts_set(&config, &section, &file)
            }
        },
        Commands::Serve { bind } => commands::cmd_serve(&config, &bind).await,
    }
}
