//! Top-level entry point: validates a `/stream` request, orchestrates
//! LineupResolver → RedirectWalker → FillerPicker → EncoderPlanBuilder, and
//! hands back a ready-to-spawn encoder plan. Spawning the process and piping
//! its bytes to the HTTP response is the caller's job (it owns the
//! connection's cancellation signal).

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, EncoderSettings, FillerShow, LineupItem};
use crate::services::concat_session::{is_throttled, DEFAULT_MAX_ATTEMPTS};
use crate::services::encoder_plan_builder::{EncoderPlanBuilder, EncoderPlanInput, EncoderSource, SyntheticReason};
use crate::services::filler_picker::FillerPicker;
use crate::services::lineup_resolver::SLACK_MS;
use crate::services::playback_cache::PlaybackCache;
use crate::services::redirect_walker::RedirectWalker;
use crate::store::{ChannelRef, MediaResolver, ResolvedMedia, Store};

const SKIP_ITERATION_LIMIT: u32 = 64;
const TOO_MANY_ATTEMPTS_OFFLINE_MS: i64 = 60_000;
const REDIRECT_CYCLE_OFFLINE_MS: i64 = 60_000;
const PERMANENT_OFFLINE_MS: i64 = 365 * 24 * 60 * 60 * 1000;
const LOADING_ITEM_MS: i64 = 40;

pub struct StreamRequest {
    pub channel: ChannelRef,
    pub session: Option<u64>,
    /// `Some(0)` triggers the first-splice stabilisation item; `Some(1)` or
    /// `None` resolves normally.
    pub first: Option<u8>,
    pub audio_only: bool,
    pub hls: bool,
}

pub struct PreparedStream {
    pub channel_number: u32,
    pub ffmpeg_command: String,
    pub args: Vec<String>,
    pub stream_duration_ms: i64,
    pub title: Option<String>,
}

enum ResolutionKind {
    Content { media: ResolvedMedia },
    Filler { media: ResolvedMedia },
    Offline { label: Option<String> },
    Error { message: String },
}

struct Resolution {
    kind: ResolutionKind,
    stream_duration_ms: i64,
    start_ms: i64,
    channel: Channel,
}

pub struct StreamController {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaResolver>,
    cache: Arc<PlaybackCache>,
    clock: Arc<dyn Clock>,
}

impl StreamController {
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaResolver>, cache: Arc<PlaybackCache>, clock: Arc<dyn Clock>) -> Self {
        Self { store, media, cache, clock }
    }

    pub fn record_attempt_failure(&self, session: u64) -> u32 {
        self.cache.record_attempt(session)
    }

    pub fn reset_session(&self, session: u64) {
        self.cache.reset_session(session);
    }

    pub async fn prepare(&self, request: &StreamRequest) -> AppResult<PreparedStream> {
        let settings = self.store.ffmpeg_settings().await;
        if !executable_exists(&settings.ffmpeg_command) {
            return Err(AppError::EncoderMissing { command: settings.ffmpeg_command.clone() });
        }

        let channel = self.store.get_channel(request.channel).await?;

        if let Some(session) = request.session {
            if is_throttled(&self.cache, session, DEFAULT_MAX_ATTEMPTS) {
                return Ok(self.offline_plan(&channel, &settings, TOO_MANY_ATTEMPTS_OFFLINE_MS, Some("Too many attempts, throttling".to_string())));
            }
        }

        if request.first == Some(0) {
            return Ok(self.offline_plan(&channel, &settings, LOADING_ITEM_MS, Some("loading".to_string())));
        }

        let is_first_join = request.session.is_none();
        let now_ms = self.clock.now_ms();

        let resolution = match self.resolve_with_skips(channel.id, now_ms, is_first_join).await {
            Ok(resolution) => resolution,
            Err(AppError::RedirectCycle { path }) => {
                warn!(channel = channel.number, "redirect cycle: {path}");
                return Ok(self.offline_plan(&channel, &settings, REDIRECT_CYCLE_OFFLINE_MS, Some(format!("Redirect cycle: {path}"))));
            }
            Err(other) => return Err(other),
        };

        self.build_plan(request, resolution, &settings)
    }

    async fn resolve_with_skips(&self, start_channel_id: Uuid, now_ms: i64, is_first_join: bool) -> AppResult<Resolution> {
        let mut channel_id = start_channel_id;
        let mut now_ms = now_ms;

        for _ in 0..SKIP_ITERATION_LIMIT {
            let walked = RedirectWalker::walk(self.store.as_ref(), channel_id, now_ms).await?;
            let channel = self.store.get_channel(ChannelRef::Id(walked.channel_id)).await?;

            match &walked.resolved.item {
                LineupItem::Content { program, .. } => {
                    return match self.media.resolve_content(program).await {
                        Ok(media) => Ok(Resolution {
                            kind: ResolutionKind::Content { media },
                            stream_duration_ms: walked.stream_duration_ms,
                            start_ms: walked.resolved.time_into_item_ms,
                            channel,
                        }),
                        Err(e) => Ok(Resolution {
                            kind: ResolutionKind::Error { message: e.to_string() },
                            stream_duration_ms: walked.stream_duration_ms,
                            start_ms: 0,
                            channel,
                        }),
                    };
                }
                LineupItem::Offline { .. } => {
                    let lineup = self.store.load_lineup(channel.id).await?;
                    if lineup.len() == 1 && lineup[0].is_offline() {
                        return Ok(Resolution {
                            kind: ResolutionKind::Offline { label: None },
                            stream_duration_ms: PERMANENT_OFFLINE_MS,
                            start_ms: 0,
                            channel,
                        });
                    }

                    let remaining = walked.stream_duration_ms;
                    if remaining <= SLACK_MS + 1 {
                        now_ms += remaining + 1;
                        channel_id = channel.id;
                        continue;
                    }

                    let mut shows: Vec<FillerShow> = Vec::new();
                    for collection in &channel.filler_collections {
                        if shows.iter().any(|s: &FillerShow| s.id == collection.filler_show_id) {
                            continue;
                        }
                        if let Ok(show) = self.store.filler_show(collection.filler_show_id).await {
                            shows.push(show);
                        }
                    }
                    let refs: Vec<&FillerShow> = shows.iter().collect();

                    let pick = FillerPicker::pick(&channel, &refs, &self.cache, now_ms, remaining, is_first_join);
                    return match pick.filler {
                        Some(picked) => {
                            self.cache.record_clip(channel.number, picked.clip.program_key_uuid(), now_ms);
                            self.cache.record_collection(channel.number, picked.collection_id, now_ms);
                            match self.media.resolve_url(&picked.clip.source_url).await {
                                Ok(media) => Ok(Resolution {
                                    kind: ResolutionKind::Filler { media },
                                    stream_duration_ms: picked.stream_duration_ms,
                                    start_ms: picked.start_offset_ms,
                                    channel,
                                }),
                                Err(e) => Ok(Resolution {
                                    kind: ResolutionKind::Error { message: e.to_string() },
                                    stream_duration_ms: picked.stream_duration_ms,
                                    start_ms: 0,
                                    channel,
                                }),
                            }
                        }
                        None => {
                            let duration = pick.minimum_wait_ms.min(remaining).max(1);
                            Ok(Resolution { kind: ResolutionKind::Offline { label: None }, stream_duration_ms: duration, start_ms: 0, channel })
                        }
                    };
                }
                LineupItem::Redirect { .. } => unreachable!("RedirectWalker never returns a redirect item"),
            }
        }

        Err(AppError::Configuration { message: format!("resolution did not converge after {SKIP_ITERATION_LIMIT} skips") })
    }

    fn build_plan(&self, request: &StreamRequest, resolution: Resolution, settings: &EncoderSettings) -> AppResult<PreparedStream> {
        let channel_number = resolution.channel.number;
        let mut settings = settings.clone();
        if let Some(w) = resolution.channel.transcode.target_width {
            settings.target_width = w;
        }
        if let Some(h) = resolution.channel.transcode.target_height {
            settings.target_height = h;
        }

        let (source, synthetic_reason, title) = match &resolution.kind {
            ResolutionKind::Content { media } => (Some((media.url.clone(), media.probe.clone())), None, None),
            ResolutionKind::Filler { media } => (Some((media.url.clone(), media.probe.clone())), None, Some("Filler".to_string())),
            ResolutionKind::Offline { label } => (None, Some(SyntheticReason::Offline), label.clone()),
            ResolutionKind::Error { message } => (None, Some(SyntheticReason::Error), Some(message.clone())),
        };

        let watermark = if resolution.channel.watermark.enabled { Some(resolution.channel.watermark.clone()) } else { None };

        let probe_holder;
        let source_ref = match &source {
            Some((url, probe)) => {
                probe_holder = probe.clone();
                Some(EncoderSource { url, probe: &probe_holder })
            }
            None => None,
        };

        let input = EncoderPlanInput {
            channel: &resolution.channel,
            settings: &settings,
            watermark: watermark.as_ref(),
            stream_duration_ms: resolution.stream_duration_ms,
            seek_ms: resolution.start_ms,
            audio_only: request.audio_only,
            title: title.as_deref(),
            subtitle: None,
            source: source_ref,
            synthetic_reason,
        };

        let args = EncoderPlanBuilder::build(&input)?;

        Ok(PreparedStream {
            channel_number,
            ffmpeg_command: settings.ffmpeg_command.clone(),
            args,
            stream_duration_ms: resolution.stream_duration_ms,
            title,
        })
    }

    fn offline_plan(&self, channel: &Channel, settings: &EncoderSettings, duration_ms: i64, label: Option<String>) -> PreparedStream {
        let input = EncoderPlanInput {
            channel,
            settings,
            watermark: None,
            stream_duration_ms: duration_ms,
            seek_ms: 0,
            audio_only: false,
            title: label.as_deref(),
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Offline),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap_or_default();
        PreparedStream {
            channel_number: channel.number,
            ffmpeg_command: settings.ffmpeg_command.clone(),
            args,
            stream_duration_ms: duration_ms,
            title: label,
        }
    }
}

/// `kill` mode produces no encoder args at all; the default settings never
/// select it, so this only matters if an operator explicitly configures it
/// for the synthetic offline fallbacks above.
impl Default for PreparedStream {
    fn default() -> Self {
        Self { channel_number: 0, ffmpeg_command: String::new(), args: Vec::new(), stream_duration_ms: 0, title: None }
    }
}

pub fn executable_exists(command: &str) -> bool {
    let path = std::path::Path::new(command);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(command).is_file()))
        .unwrap_or(false)
}
