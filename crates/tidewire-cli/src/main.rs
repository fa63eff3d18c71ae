mod commands;
mod logging;
mod registry;

use clap::{Parser, Subcommand};

use registry::{ConnectorKind, DestinationKind, SourceKind};

#[derive(Parser)]
#[command(
    name = "tidewire",
    version,
    about = "Run resilient data connectors from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve one batch from a source and print it as JSON
    Retrieve {
        #[arg(value_enum)]
        connector: SourceKind,
    },
    /// Insert records into a destination, one call per record
    Insert {
        #[arg(value_enum)]
        connector: DestinationKind,
        /// Record as a JSON object; repeatable. Reads JSON lines from stdin when omitted
        #[arg(long = "record")]
        records: Vec<String>,
    },
    /// Connect to a backend and disconnect again
    Check {
        #[arg(value_enum)]
        connector: ConnectorKind,
    },
    /// List available connectors
    Connectors,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Retrieve { connector } => commands::retrieve::execute(connector).await,
        Commands::Insert { connector, records } => {
            commands::insert::execute(connector, records).await
        }
        Commands::Check { connector } => commands::check::execute(connector).await,
        Commands::Connectors => commands::connectors::execute(),
    }
}
