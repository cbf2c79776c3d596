use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "jetctl")]
#[command(about = "Run step sequences against the plasma jet rig")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.jetctl/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and run a sequence file against the device API
    Run {
        /// Sequence file (TOML)
        file: PathBuf,

        /// Keep going after a failed step instead of stopping the run
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Check a sequence file against the safety rules without running it
    Validate {
        /// Sequence file (TOML)
        file: PathBuf,
    },

    /// List the available step kinds
    Kinds {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            file,
            continue_on_error,
        } => {
            cli::run::run_command(config_path, &file, continue_on_error).await?;
        }
        Commands::Validate { file } => {
            cli::validate::validate_command(config_path, &file)?;
        }
        Commands::Kinds { json } => {
            cli::kinds::kinds_command(json)?;
        }
        Commands::Init { force } => {
            cli::init::init_command(config_path.map(PathBuf::from), force)?;
        }
    }

    Ok(())
}
