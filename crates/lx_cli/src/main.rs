use anyhow::Context;
use clap::Parser;
use lx_core::{Config, Filter, RecordStore};
use lx_sources::cli::{handle_command, SourceArgs, SourceCommands};
use lx_sources::logging::init_logging;
use lx_sources::{info, warn, FetchManager, MediaService};
use lx_storage::accounts::PROFILES_TABLE;
use lx_storage::{Accounts, LocalSavedStore, SavedArticles};
use lx_web::{create_app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

async fn check_store(store: &Arc<dyn RecordStore>) -> lx_core::Result<()> {
    store.select(PROFILES_TABLE, &[Filter::eq("id", "health-check")]).await?;
    info!("🏦 Record store reachable");
    Ok(())
}

async fn check_store_with_retry(store: &Arc<dyn RecordStore>, max_retries: u32, timeout: Duration) -> lx_core::Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_store(store)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(elapsed) => {
                last_error = Some(lx_core::Error::Storage(format!("Record store check timed out: {}", elapsed)));
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Record store check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| lx_core::Error::Storage("Record store check failed after all retries".to_string())))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// How long fetched articles stay cached (e.g. 15m, 1h 30m)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    cache_ttl: Option<Duration>,
    /// Directory for rate-limiter state and saved articles
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
        #[arg(long, default_value = "supabase", help = "Identity backend: supabase (default) or memory")]
        identity: String,
    },
    #[command(flatten)]
    Source(SourceCommands),
}

fn load_config(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(ttl) = cli.cache_ttl {
        config.cache_ttl = ttl;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    config
}

async fn serve(config: Config, addr: &str, identity: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("building HTTP client")?;

    let fetch = FetchManager::from_config(&config)?;
    let media = MediaService::from_config(&config.media)?;
    info!("🎞️ Media enrichment {}", if media.is_configured() { "enabled" } else { "not configured" });

    let store = lx_storage::create_store(&config, client.clone());
    match &store {
        Some(store) => {
            info!("💾 Checking record store connection...");
            if let Err(e) = check_store_with_retry(store, 3, Duration::from_secs(10)).await {
                warn!("⚠️ Record store unavailable, saved articles stay local for now: {}", e);
            }
        }
        None => info!("💾 No record store configured, saved articles are local only"),
    }

    let local = LocalSavedStore::from_dir(config.data_dir.as_deref());
    let identity = lx_storage::create_identity(identity, &config, client);
    let state = AppState {
        fetch: Arc::new(fetch),
        media: Arc::new(media),
        saved: Arc::new(SavedArticles::new(local, store.clone())),
        accounts: Arc::new(Accounts::new(identity, store.clone())),
        store,
        config: Arc::new(config),
    };

    let app = create_app(state).await;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("🚀 Luxora listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli);

    match cli.command {
        Commands::Serve { addr, identity } => serve(config, &addr, &identity).await?,
        Commands::Source(command) => {
            let manager = FetchManager::from_config(&config)?;
            let media = MediaService::from_config(&config.media)?;
            handle_command(SourceArgs { command }, &manager, &media).await?;
        }
    }

    Ok(())
}
