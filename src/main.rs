use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sandboxed_file_manager::{CleanupPolicy, SandboxedManager, TimeMatch};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airtime::{
    clock::SystemClock,
    config::Config,
    observability::AppObservability,
    services::{ConcatSessionRegistry, PlaybackCache, StreamController},
    store::{FfprobeMediaResolver, MemoryStore, Store},
    web::{AppState, WebServer},
};

fn get_dependencies() -> Result<Value, Box<dyn std::error::Error>> {
    let sbom_str = include_str!(concat!(env!("OUT_DIR"), "/sbom.json"));
    let sbom: Value = serde_json::from_str(sbom_str)?;
    Ok(sbom)
}

fn print_version_info() {
    println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Build Information:");
    println!("  Target: {}-{}", std::env::consts::ARCH, std::env::consts::OS);
    println!();
    println!("Software Bill of Materials:");

    match get_dependencies() {
        Ok(sbom) => {
            let mut dependencies = Vec::new();
            if let Some(packages) = sbom["packages"].as_array() {
                for package in packages {
                    if let (Some(name), Some(version)) = (package["name"].as_str(), package["versionInfo"].as_str()) {
                        if name != env!("CARGO_PKG_NAME") && !version.contains("path+") {
                            dependencies.push((name.to_string(), version.to_string()));
                        }
                    }
                }
            }
            dependencies.sort_by(|a, b| a.0.cmp(&b.0));
            if dependencies.is_empty() {
                println!("  (No external components found in SBOM)");
            } else {
                for (name, version) in dependencies {
                    println!("  {name}: {version}");
                }
            }
        }
        Err(_) => println!("  (Unable to read SBOM data)"),
    }

    println!();
    println!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
    println!("License: {}", env!("CARGO_PKG_LICENSE"));
    println!("Authors: {}", env!("CARGO_PKG_AUTHORS"));
}

#[derive(Parser)]
#[command(name = "airtime")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A virtual broadcaster that schedules and transcodes channel lineups into continuous streams")]
#[command(long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Print version information including dependency versions
    #[arg(short = 'v', long)]
    version: bool,
}

fn parse_duration(duration_str: &str) -> Result<std::time::Duration> {
    humantime::parse_duration(duration_str).map_err(|e| anyhow::anyhow!("invalid duration '{duration_str}': {e}"))
}

async fn build_segment_manager(path: &str, retention: &str, cleanup_interval: &str) -> Result<SandboxedManager> {
    Ok(SandboxedManager::builder()
        .base_directory(path)
        .cleanup_policy(CleanupPolicy::new().remove_after(parse_duration(retention)?).time_match(TimeMatch::Modified))
        .cleanup_interval(parse_duration(cleanup_interval)?)
        .build()
        .await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        print_version_info();
        return Ok(());
    }

    let log_filter = if cli.log_level == "trace" {
        format!("airtime={},tower_http=trace", cli.log_level)
    } else {
        format!("airtime={}", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting airtime v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let store: Arc<dyn Store> = Arc::new(MemoryStore::from_file(&config.channels.definitions_path)?);
    let media = Arc::new(FfprobeMediaResolver::new(config.encoder.ffprobe_command.clone()));
    let cache = Arc::new(PlaybackCache::default());
    let clock = Arc::new(SystemClock);

    let controller = Arc::new(StreamController::new(store.clone(), media, cache, clock));
    let registry = Arc::new(ConcatSessionRegistry::new());

    let hls_file_manager = build_segment_manager(
        &config.storage.hls_path,
        &config.storage.segment_retention,
        &config.storage.segment_cleanup_interval,
    )
    .await?;
    info!(
        "HLS segment directory '{}' managed with {} retention, cleanup every {}",
        config.storage.hls_path, config.storage.segment_retention, config.storage.segment_cleanup_interval
    );

    let observability = Arc::new(AppObservability::new("airtime")?);
    let state = AppState::new(store, config, controller, registry, hls_file_manager, observability);
    let web_server = WebServer::new(state)?;

    info!("starting web server on {}:{}", web_server.host(), web_server.port());

    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server.serve_with_signal(server_ready_tx).await {
            tracing::error!("web server failed: {e}");
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => info!("web server is listening"),
        Ok(Err(bind_error)) => {
            tracing::error!("failed to bind web server: {bind_error}");
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("web server task completed without signaling");
            return Err(anyhow::anyhow!("web server failed to start"));
        }
    }

    server_handle.await?;
    Ok(())
}
