//! The entire streaming surface: one-shot segment delivery (`/stream`), the
//! self-feeding concat manifest (`/playlist`), the infinite `mpegts` facade
//! built on top of it (`/video`, `/radio`), a lazily-started HLS passthrough
//! (`/m3u8`), the static no-channels screen (`/setup`) and a couple of M3U
//! pointer files for media players.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Channel, OfflinePolicy, TranscodeOverrides, Watermark};
use crate::observability::AppObservability;
use crate::services::{
    build_playlist_manifest, executable_exists, EncoderPlanBuilder, EncoderPlanInput, EncoderProcess, StreamQueryParams,
    StreamRequest, SyntheticReason,
};
use crate::store::ChannelRef;
use crate::web::responses::handle_error;
use crate::web::AppState;

/// Wraps a stdout byte stream together with the `EncoderProcess` that's
/// writing it. The process is only ever dropped when the response body is,
/// which happens as soon as axum notices the client went away — that drop
/// kills the ffmpeg child. No separate cancellation plumbing is needed.
/// Also records client transfer metrics on drop, since that's the one
/// moment we reliably know the session just ended.
struct ManagedEncoderStream {
    inner: ReaderStream<tokio::process::ChildStdout>,
    counter: Arc<AtomicU64>,
    _process: EncoderProcess,
    channel: u32,
    started_at: Instant,
    observability: Arc<AppObservability>,
}

impl Stream for ManagedEncoderStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                Poll::Ready(Some(Ok(bytes)))
            }
            other => other,
        }
    }
}

impl Drop for ManagedEncoderStream {
    fn drop(&mut self) {
        let bytes_sent = self.counter.load(Ordering::Relaxed);
        let duration = self.started_at.elapsed().as_secs_f64();
        self.observability.record_client_disconnected(self.channel, bytes_sent, duration);
    }
}

fn parse_channel_ref(raw: &str) -> AppResult<ChannelRef> {
    if raw.is_empty() {
        return Err(AppError::bad_request("missing channel"));
    }
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(ChannelRef::Id(id));
    }
    raw.parse::<u32>()
        .map(ChannelRef::Number)
        .map_err(|_| AppError::bad_request(format!("invalid channel '{raw}'")))
}

fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("1") | Some("true") | Some("yes") | Some(""))
}

async fn spawn_stream_response(state: &AppState, channel_number: u32, command: &str, args: &[String], content_type: &'static str) -> Response {
    let mut process = match EncoderProcess::spawn(channel_number, command, args).await {
        Ok(process) => process,
        Err(e) => return handle_error(e),
    };

    let Some(stdout) = process.take_stdout() else {
        return handle_error(AppError::Configuration {
            message: "encoder produced no stdout pipe".to_string(),
        });
    };

    state.observability.record_client_connected(channel_number);

    let counter = process.bytes_counter();
    let body = Body::from_stream(ManagedEncoderStream {
        inner: ReaderStream::new(stdout),
        counter,
        _process: process,
        channel: channel_number,
        started_at: Instant::now(),
        observability: state.observability.clone(),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .expect("static response parts are always valid")
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub channel: Option<String>,
    pub session: Option<u64>,
    pub first: Option<u8>,
    #[serde(rename = "audioOnly")]
    pub audio_only: Option<String>,
    pub hls: Option<String>,
    pub m3u8: Option<String>,
}

/// One shot: resolve the lineup item currently (or next) due and stream its
/// encoded bytes until that item's duration runs out. Never loops by itself
/// — the concat manifest is what makes it look infinite.
pub async fn stream(State(state): State<AppState>, Query(query): Query<StreamQuery>) -> Response {
    let Some(raw) = &query.channel else {
        return handle_error(AppError::bad_request("missing channel"));
    };
    let channel = match parse_channel_ref(raw) {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let request = StreamRequest {
        channel,
        session: query.session,
        first: query.first,
        audio_only: flag(&query.audio_only),
        hls: flag(&query.hls) || flag(&query.m3u8),
    };

    let prepared = match state.controller.prepare(&request).await {
        Ok(p) => p,
        Err(e) => return handle_error(e),
    };

    spawn_stream_response(&state, prepared.channel_number, &prepared.ffmpeg_command, &prepared.args, "video/mp2t").await
}

#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    pub channel: Option<String>,
    #[serde(rename = "audioOnly")]
    pub audio_only: Option<String>,
    pub hls: Option<String>,
}

/// The `ffconcat` manifest ffmpeg is pointed at by `/video`/`/radio`/`/m3u8`.
/// Two identical entries plus `-stream_loop -1` on the reader is what turns
/// a sequence of one-shot `/stream` segments into an unbroken feed.
pub async fn playlist(State(state): State<AppState>, Query(query): Query<PlaylistQuery>) -> Response {
    let Some(raw) = &query.channel else {
        return handle_error(AppError::bad_request("missing channel"));
    };
    let channel_ref = match parse_channel_ref(raw) {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let channel = match state.store.get_channel(channel_ref).await {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let session = state.registry.next_session_id();
    let manifest = build_playlist_manifest(
        &state.config.web.base_url,
        channel.number,
        session,
        &StreamQueryParams {
            audio_only: flag(&query.audio_only),
            hls: flag(&query.hls),
        },
    );

    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], manifest).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub channel: Option<String>,
}

fn concat_reader_args(playlist_url: String) -> Vec<String> {
    vec![
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
        "mpegts".to_string(),
        "pipe:1".to_string(),
    ]
}

/// Feeds ffmpeg a loopback request to its own `/playlist`, rather than
/// writing a manifest to disk — `/playlist` stays the single place that
/// knows the manifest's shape.
async fn concat_stream(state: &AppState, channel_raw: &str, audio_only: bool) -> Response {
    let channel_ref = match parse_channel_ref(channel_raw) {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };
    let channel = match state.store.get_channel(channel_ref).await {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let settings = state.store.ffmpeg_settings().await;
    if !executable_exists(&settings.ffmpeg_command) {
        return handle_error(AppError::EncoderMissing {
            command: settings.ffmpeg_command,
        });
    }

    let mut playlist_url = format!("{}/playlist?channel={}", state.config.web.base_url, channel.number);
    if audio_only {
        playlist_url.push_str("&audioOnly=1");
    }

    let args = concat_reader_args(playlist_url);
    spawn_stream_response(state, channel.number, &settings.ffmpeg_command, &args, "video/mp2t").await
}

pub async fn video(State(state): State<AppState>, Query(query): Query<ChannelQuery>) -> Response {
    let Some(raw) = &query.channel else {
        return handle_error(AppError::bad_request("missing channel"));
    };
    concat_stream(&state, raw, false).await
}

pub async fn radio(State(state): State<AppState>, Query(query): Query<ChannelQuery>) -> Response {
    let Some(raw) = &query.channel else {
        return handle_error(AppError::bad_request("missing channel"));
    };
    concat_stream(&state, raw, true).await
}

fn placeholder_channel() -> Channel {
    Channel {
        id: Uuid::nil(),
        number: 0,
        name: "Setup".to_string(),
        group_title: None,
        start_time_ms: 0,
        duration_ms: 60_000,
        icon: None,
        watermark: Watermark::default(),
        offline: OfflinePolicy::default(),
        transcode: TranscodeOverrides::default(),
        stealth: true,
        filler_collections: Vec::new(),
        disable_filler_overlay: true,
        filler_repeat_cooldown_ms: 0,
    }
}

/// The screen served before any channel exists: a static "no channels
/// configured" offline card, built directly from `EncoderPlanBuilder`
/// without going through `StreamController` since there's no real channel.
pub async fn setup(State(state): State<AppState>) -> Response {
    let settings = state.store.ffmpeg_settings().await;
    if !executable_exists(&settings.ffmpeg_command) {
        return handle_error(AppError::EncoderMissing {
            command: settings.ffmpeg_command,
        });
    }

    let channel = placeholder_channel();
    let input = EncoderPlanInput {
        channel: &channel,
        settings: &settings,
        watermark: None,
        stream_duration_ms: 60_000,
        seek_ms: 0,
        audio_only: false,
        title: Some("No channels configured"),
        subtitle: None,
        source: None,
        synthetic_reason: Some(SyntheticReason::Offline),
    };

    let args = match EncoderPlanBuilder::build(&input) {
        Ok(a) => a,
        Err(e) => return handle_error(e),
    };

    spawn_stream_response(&state, channel.number, &settings.ffmpeg_command, &args, "video/mp2t").await
}

/// Lazily starts (or reuses) a per-channel `ffmpeg -c copy -f hls` session
/// reading the loopback playlist, then hands back the manifest it wrote.
/// A simple single-rendition passthrough, not a real HLS packager.
pub async fn m3u8(State(state): State<AppState>, Query(query): Query<ChannelQuery>) -> Response {
    let Some(raw) = &query.channel else {
        return handle_error(AppError::bad_request("missing channel"));
    };
    let channel_ref = match parse_channel_ref(raw) {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };
    let channel = match state.store.get_channel(channel_ref).await {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    if let Err(e) = state.ensure_hls_session(&channel).await {
        return handle_error(e);
    }

    let file_name = format!("channel-{}.m3u8", channel.number);
    match state.hls_file_manager.read_to_string(&file_name).await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/x-mpegURL")], body).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "HLS playlist not written yet, retry shortly").into_response(),
    }
}

fn parse_m3u_tail(tail: &str) -> AppResult<u32> {
    let stripped = tail
        .strip_suffix(".m3u")
        .ok_or_else(|| AppError::bad_request(format!("expected a '.m3u' path, got '{tail}'")))?;
    stripped
        .parse::<u32>()
        .map_err(|_| AppError::bad_request(format!("invalid channel number '{stripped}'")))
}

#[derive(Debug, Deserialize)]
pub struct FastQuery {
    pub fast: Option<String>,
}

/// One-line M3U pointing at `/video` (fast, raw concat passthrough) or
/// `/m3u8` (the HLS session) depending on the `fast` flag.
pub async fn media_player_m3u(State(state): State<AppState>, Path(tail): Path<String>, Query(query): Query<FastQuery>) -> Response {
    let number = match parse_m3u_tail(&tail) {
        Ok(n) => n,
        Err(e) => return handle_error(e),
    };
    let channel = match state.store.get_channel(ChannelRef::Number(number)).await {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let base = &state.config.web.base_url;
    let target = if flag(&query.fast) {
        format!("{base}/video?channel={}", channel.number)
    } else {
        format!("{base}/m3u8?channel={}", channel.number)
    };

    (StatusCode::OK, [(header::CONTENT_TYPE, "video/x-mpegurl")], format!("{target}\n")).into_response()
}

/// One-line M3U pointing at `/radio` for a given channel.
pub async fn media_player_radio_m3u(State(state): State<AppState>, Path(tail): Path<String>) -> Response {
    let number = match parse_m3u_tail(&tail) {
        Ok(n) => n,
        Err(e) => return handle_error(e),
    };
    let channel = match state.store.get_channel(ChannelRef::Number(number)).await {
        Ok(c) => c,
        Err(e) => return handle_error(e),
    };

    let target = format!("{}/radio?channel={}", state.config.web.base_url, channel.number);
    (StatusCode::OK, [(header::CONTENT_TYPE, "video/x-mpegurl")], format!("{target}\n")).into_response()
}
