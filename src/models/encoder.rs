//! Encoder configuration consumed by EncoderPlanBuilder: the merged
//! defaults ⊕ user overrides ⊕ per-channel overrides layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeinterlaceFilter {
    None,
    Yadif,
    Bwdif,
}

impl DeinterlaceFilter {
    pub fn filter_name(&self) -> Option<&'static str> {
        match self {
            DeinterlaceFilter::None => None,
            DeinterlaceFilter::Yadif => Some("yadif"),
            DeinterlaceFilter::Bwdif => Some("bwdif"),
        }
    }
}

/// What the encoder should generate when there is no real input to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineScreenMode {
    Pic,
    Static,
    Testsrc,
    Text,
    /// No encoder is started; the request fails immediately.
    Kill,
}

/// Audio synthesis rule applied under an error/offline screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAudioMode {
    Sine,
    WhiteNoise,
    Silence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    /// `mpegts` muxed straight to stdout for direct serving.
    Mpegts,
    Hls,
    Dash,
}

/// The three-layer merged settings EncoderPlanBuilder reads: global defaults,
/// operator overrides from configuration, and any still-more-specific
/// per-channel transcode overrides already folded in by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub ffmpeg_command: String,
    pub max_fps: f64,
    pub deinterlace_filter: DeinterlaceFilter,
    pub offline_screen_mode: OfflineScreenMode,
    pub error_audio_mode: ErrorAudioMode,
    pub normalize_video_codec: bool,
    pub normalize_audio_codec: bool,
    /// Target codec family name matched against the probed codec via
    /// substring rules (e.g. "h264", "hevc", "mpeg2").
    pub target_video_codec: String,
    /// Target audio codec family name (e.g. "aac", "mp3", "ac3", "flac").
    pub target_audio_codec: String,
    /// Forces a transcode when the source channel layout or sample rate
    /// differs from the target, independent of whether codec families match.
    pub normalize_audio_channels_sample_rate: bool,
    pub target_audio_sample_rate: u32,
    pub target_audio_channels: u32,
    pub target_width: u32,
    pub target_height: u32,
    pub normalize_resolution: bool,
    /// 0-2.0; 1.0 = unchanged. Values outside [0, 0.7] are clamped under error audio.
    pub volume_percent: u32,
    pub apad: bool,
    pub output_target: OutputTarget,
    pub hls_segment_duration_secs: u32,
    pub hls_segment_dir: String,
    pub dash_segment_dir: String,
    /// Number of stale HLS segments retained on disk before deletion.
    pub hls_delete_threshold: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_command: "ffmpeg".to_string(),
            max_fps: 60.0,
            deinterlace_filter: DeinterlaceFilter::None,
            offline_screen_mode: OfflineScreenMode::Pic,
            error_audio_mode: ErrorAudioMode::Silence,
            normalize_video_codec: true,
            normalize_audio_codec: true,
            target_video_codec: "h264".to_string(),
            target_audio_codec: "aac".to_string(),
            normalize_audio_channels_sample_rate: false,
            target_audio_sample_rate: 48_000,
            target_audio_channels: 2,
            target_width: 1920,
            target_height: 1080,
            normalize_resolution: true,
            volume_percent: 100,
            apad: true,
            output_target: OutputTarget::Mpegts,
            hls_segment_duration_secs: 6,
            hls_segment_dir: "./data/hls".to_string(),
            dash_segment_dir: "./data/dash".to_string(),
            hls_delete_threshold: 3,
        }
    }
}
