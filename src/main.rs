use std::path::PathBuf;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use docshelf::{Config, Database};

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "File-per-document JSON store")]
struct Cli {
    /// Database root directory
    #[arg(long, default_value = "db")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database root and collections directory
    Init {
        /// Also create the reserved `indexes` directory
        #[arg(long)]
        with_indexes: bool,
    },
    /// Insert a sample document into the `test` collection
    Test,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docshelf=info")),
        )
        .init();

    let cli = Cli::parse();
    let db = Database::open(config_for(&cli))?;

    match cli.command {
        Commands::Init { .. } => {
            println!("Initialized database at {}", db.config().storage_path.display());
        }
        Commands::Test => {
            let id = db.insert_one("test", &json!({ "name": "test" })).await?;
            println!("Inserted test document {}", id);
        }
    }

    Ok(())
}

fn config_for(cli: &Cli) -> Config {
    let config = Config::new(cli.data_dir.clone());
    match cli.command {
        Commands::Init { with_indexes } => config.with_reserved_index_dir(with_indexes),
        Commands::Test => config,
    }
}
