//! HTTP interface for the broadcaster core.
//!
//! There's no content-management API here — channels and lineups are owned
//! by the `Store` the binary wires up at startup. The surface is almost
//! entirely stream delivery: a handful of byte-stream endpoints plus three
//! health probes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use sandboxed_file_manager::SandboxedManager;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::errors::AppResult;
use crate::models::Channel;
use crate::observability::AppObservability;
use crate::services::{executable_exists, ConcatSessionRegistry, EncoderProcess, StreamController};
use crate::store::Store;

pub mod handlers;
pub mod responses;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub controller: Arc<StreamController>,
    pub registry: Arc<ConcatSessionRegistry>,
    pub hls_file_manager: SandboxedManager,
    pub observability: Arc<AppObservability>,
    /// Persistent per-channel `ffmpeg -c copy -f hls` passthrough sessions,
    /// spawned lazily on first `/m3u8` request and reused after that.
    hls_sessions: Arc<Mutex<HashMap<u32, EncoderProcess>>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        config: Config,
        controller: Arc<StreamController>,
        registry: Arc<ConcatSessionRegistry>,
        hls_file_manager: SandboxedManager,
        observability: Arc<AppObservability>,
    ) -> Self {
        Self {
            store,
            config,
            controller,
            registry,
            hls_file_manager,
            observability,
            hls_sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn encoder_available(&self) -> bool {
        executable_exists(&self.config.encoder.ffmpeg_command)
    }

    /// Starts (or confirms still-alive) the HLS passthrough for `channel`.
    pub(crate) async fn ensure_hls_session(&self, channel: &Channel) -> AppResult<()> {
        let mut sessions = self.hls_sessions.lock().await;

        if let Some(process) = sessions.get_mut(&channel.number) {
            if process.try_wait()?.is_none() {
                return Ok(());
            }
            sessions.remove(&channel.number);
        }

        let settings = self.store.ffmpeg_settings().await;
        if !executable_exists(&settings.ffmpeg_command) {
            return Err(crate::errors::AppError::EncoderMissing {
                command: settings.ffmpeg_command,
            });
        }

        let playlist_url = format!("{}/playlist?channel={}&hls=1", self.config.web.base_url, channel.number);
        let output_path = format!("{}/channel-{}.m3u8", settings.hls_segment_dir, channel.number);

        let args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-reconnect".to_string(),
            "1".to_string(),
            "-reconnect_streamed".to_string(),
            "1".to_string(),
            "-reconnect_delay_max".to_string(),
            "2".to_string(),
            "-f".to_string(),
            "ffconcat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-stream_loop".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            playlist_url,
            "-c".to_string(),
            "copy".to_string(),
            "-f".to_string(),
            "hls".to_string(),
            "-hls_time".to_string(),
            settings.hls_segment_duration_secs.to_string(),
            "-hls_list_size".to_string(),
            settings.hls_delete_threshold.to_string(),
            "-hls_flags".to_string(),
            "delete_segments".to_string(),
            output_path,
        ];

        let process = EncoderProcess::spawn(channel.number, &settings.ffmpeg_command, &args).await?;
        sessions.insert(channel.number, process);
        Ok(())
    }
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        let app = Self::create_router(state);
        Ok(Self { app, addr })
    }

    fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/ready", get(handlers::health::readiness_check))
            .route("/live", get(handlers::health::liveness_check))
            .route("/setup", get(handlers::stream::setup))
            .route("/stream", get(handlers::stream::stream))
            .route("/playlist", get(handlers::stream::playlist))
            .route("/video", get(handlers::stream::video))
            .route("/radio", get(handlers::stream::radio))
            .route("/m3u8", get(handlers::stream::m3u8))
            .route("/media-player/radio/{*tail}", get(handlers::stream::media_player_radio_m3u))
            .route("/media-player/{*tail}", get(handlers::stream::media_player_m3u))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Serves until shutdown, signalling the caller once actually bound (or
    /// immediately on a bind failure) so startup can report readiness.
    pub async fn serve_with_signal(self, ready_signal: tokio::sync::oneshot::Sender<Result<()>>) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));
                axum::serve(listener, self.app).await?;
                Ok(())
            }
            Err(bind_error) => {
                let message = format!("failed to bind to {}: {bind_error}", self.addr);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{message}")));
                Err(anyhow::anyhow!("{message}"))
            }
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}
