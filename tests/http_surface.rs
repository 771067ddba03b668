//! In-process HTTP surface tests: build the real route table over a real
//! `AppState` (in-memory store, no ffmpeg on PATH) and drive it with
//! `tower::ServiceExt::oneshot`, mirroring how the teacher's own API tests
//! exercise a router without binding a socket.

use std::sync::Arc;

use airtime::clock::FixedClock;
use airtime::config::Config;
use airtime::errors::AppResult;
use airtime::models::program::ProgramKey;
use airtime::models::{Channel, LineupItem, OfflinePolicy, ProbeStats, TranscodeOverrides, Watermark};
use airtime::observability::AppObservability;
use airtime::services::{ConcatSessionRegistry, PlaybackCache, StreamController};
use airtime::store::memory::{ChannelDefinitions, MemoryStore};
use airtime::store::media::{MediaResolver, ResolvedMedia};
use airtime::web::handlers::{health, stream};
use airtime::web::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use sandboxed_file_manager::SandboxedManager;
use tower::ServiceExt;
use uuid::Uuid;

struct StubMediaResolver;

#[async_trait]
impl MediaResolver for StubMediaResolver {
    async fn resolve_content(&self, program: &ProgramKey) -> AppResult<ResolvedMedia> {
        self.resolve_url(&program.external_key).await
    }

    async fn resolve_url(&self, url: &str) -> AppResult<ResolvedMedia> {
        Ok(ResolvedMedia {
            url: url.to_string(),
            probe: ProbeStats {
                width: 1280,
                height: 720,
                sar_num: 1,
                sar_den: 1,
                fps: 30.0,
                scan_type: airtime::models::probe::ScanType::Progressive,
                video_codec: "h264".into(),
                audio_codec: Some("aac".into()),
                audio_stream_index: Some(1),
                has_video: true,
                has_audio: true,
            },
        })
    }
}

fn content_channel(number: u32) -> Channel {
    Channel {
        id: Uuid::new_v4(),
        number,
        name: format!("Channel {number}"),
        group_title: None,
        start_time_ms: 0,
        duration_ms: 600_000,
        icon: None,
        watermark: Watermark::default(),
        offline: OfflinePolicy::default(),
        transcode: TranscodeOverrides::default(),
        stealth: false,
        filler_collections: vec![],
        disable_filler_overlay: false,
        filler_repeat_cooldown_ms: 0,
    }
}

async fn build_app() -> Router {
    let channel = content_channel(1);
    let channel_id = channel.id;
    let mut lineups = std::collections::HashMap::new();
    lineups.insert(
        channel_id,
        vec![LineupItem::Content {
            program: ProgramKey { source_type: "t".into(), external_source_id: "1".into(), external_key: "file:///a.mp4".into() },
            duration_ms: 600_000,
        }],
    );
    let store: Arc<dyn airtime::store::Store> = Arc::new(MemoryStore::new(ChannelDefinitions {
        channels: vec![channel],
        lineups,
        filler_shows: vec![],
        encoder_settings: Default::default(),
    }));

    let controller = Arc::new(StreamController::new(
        store.clone(),
        Arc::new(StubMediaResolver),
        Arc::new(PlaybackCache::new()),
        Arc::new(FixedClock(1_000)),
    ));
    let registry = Arc::new(ConcatSessionRegistry::new());
    let observability = Arc::new(AppObservability::new("airtime-test").expect("meter provider builds without an OTLP endpoint"));
    let tmp = tempfile::tempdir().expect("tempdir");
    let hls_file_manager = SandboxedManager::builder()
        .base_directory(tmp.path())
        .build()
        .await
        .expect("sandboxed manager builds over a real temp directory");

    let state = AppState::new(store, Config::default(), controller, registry, hls_file_manager, observability);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/live", get(health::liveness_check))
        .route("/setup", get(stream::setup))
        .route("/stream", get(stream::stream))
        .route("/playlist", get(stream::playlist))
        .route("/video", get(stream::video))
        .route("/radio", get(stream::radio))
        .route("/m3u8", get(stream::m3u8))
        .route("/media-player/radio/{*tail}", get(stream::media_player_radio_m3u))
        .route("/media-player/{*tail}", get(stream::media_player_m3u))
        .with_state(state)
}

#[tokio::test]
async fn health_reports_ffmpeg_presence() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("ffmpeg").is_some());
}

#[tokio::test]
async fn liveness_is_always_alive() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn playlist_manifest_for_known_channel_is_ffconcat() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/playlist?channel=1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("ffconcat version 1.0"));
}

#[tokio::test]
async fn playlist_for_unknown_channel_is_not_found() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/playlist?channel=999").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stream_with_bad_channel_format_is_bad_request() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/stream?channel=not-a-number").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn media_player_m3u_routes_through_the_wildcard_tail() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/media-player/1.m3u").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    // Points at the HLS session by default (no `?fast=` flag).
    assert!(text.trim_end().ends_with("/m3u8?channel=1"));
}

#[tokio::test]
async fn media_player_m3u_for_unknown_channel_is_not_found() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/media-player/999.m3u").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn setup_without_ffmpeg_on_path_reports_encoder_missing() {
    let app = build_app().await;
    let response = app
        .oneshot(Request::builder().uri("/setup").body(Body::empty()).unwrap())
        .await
        .unwrap();
    // The test environment has no guarantee ffmpeg is on PATH; setup must
    // respond either way rather than panic. `EncoderMissing` maps to 500.
    assert!(response.status() == StatusCode::OK || response.status() == StatusCode::INTERNAL_SERVER_ERROR);
}
