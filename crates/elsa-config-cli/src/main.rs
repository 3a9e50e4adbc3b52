//! elsa-config - Elsa Data configuration resolver

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "elsa-config")]
#[command(version)]
#[command(about = "Resolve Elsa Data configuration from its layered sources", long_about = None)]
struct Cli {
    /// Meta configuration string, e.g. "file('base') file('dev')"
    /// [default: $ELSA_DATA_META_CONFIG_SOURCES]
    #[arg(long, global = true)]
    meta: Option<String>,

    /// Folders searched by file(...) sources, separated like PATH
    /// [default: $ELSA_DATA_META_CONFIG_FOLDERS or ./config]
    #[arg(long, global = true)]
    folders: Option<String>,

    /// How failures are reported
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and validate, printing the configuration with secrets redacted
    Resolve,

    /// Print the merged configuration before validation
    Merged,

    /// List the sources named by the meta string
    Sources,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elsa_config=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let args = commands::CommonArgs {
        meta: cli.meta,
        folders: cli.folders,
        format: cli.format,
    };

    match cli.command {
        Commands::Resolve => commands::resolve::execute(args),
        Commands::Merged => commands::merged::execute(args),
        Commands::Sources => commands::sources::execute(args),
    }
}
