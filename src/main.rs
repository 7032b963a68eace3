//! Catalog worker - runs library catalog jobs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_worker::{
    config::DEFAULT_SEARCH_URL, job::read_batch, CatalogSearchClient, CredentialVault, Credentials, JobWorker, Role,
    VaultKey, WorkerConfig,
};

/// Library catalog job worker.
#[derive(Parser)]
#[command(name = "catalog-worker", about = "Run library catalog jobs")]
struct Cli {
    /// Credential vault key (URL-safe base64, 32 bytes).
    #[arg(long, env = "ENCRYPTION_KEY", hide_env_values = true, global = true)]
    key: Option<String>,

    /// Catalog search endpoint.
    #[arg(long, env = "CATALOG_SEARCH_URL", default_value = DEFAULT_SEARCH_URL, global = true)]
    search_url: String,

    /// Timeout for each search request, in seconds.
    #[arg(long, env = "CATALOG_SEARCH_TIMEOUT_SECS", default_value_t = 10, global = true)]
    search_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process job descriptors (an object, an array, or NDJSON) and print envelopes.
    Process {
        /// Descriptor file; reads stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Seal credentials for use as `encryptedCredentials`.
    Encrypt {
        /// Role to embed: admin, librarian, member.
        #[arg(long, default_value = "member")]
        user_type: String,
    },

    /// Run a catalog search and print the normalized outcome.
    Search {
        /// Free-text query.
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON only.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let search_timeout = Duration::from_secs(cli.search_timeout_secs);

    match cli.command {
        Commands::Process { file } => {
            let config = WorkerConfig::from_encoded_key(cli.key.as_deref())?
                .with_search_url(cli.search_url)
                .with_search_timeout(search_timeout);
            process_jobs(config, file).await?;
        }

        Commands::Encrypt { user_type } => {
            let key = VaultKey::from_base64(cli.key.as_deref().unwrap_or_default())?;
            let token = CredentialVault::new(key).encrypt(&Credentials::new(Role::from(user_type)))?;
            println!("{}", token);
        }

        Commands::Search { query } => {
            let client = CatalogSearchClient::new(&cli.search_url, search_timeout)?;
            let outcome = client.search(&query).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Run every descriptor in order, printing one envelope per line.
async fn process_jobs(config: WorkerConfig, file: Option<PathBuf>) -> Result<()> {
    let worker = JobWorker::new(config)?;

    let raw = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let entries = read_batch(&raw);
    tracing::info!(count = entries.len(), "Processing job descriptors");

    for entry in entries {
        let envelope = worker.run_entry(entry).await;
        println!("{}", envelope.to_json_line()?);
    }

    Ok(())
}
