//! Pure translation of a resolved lineup item into a flat ffmpeg argument
//! list: global flags, input(s), `-filter_complex`, output mapping, muxer.
//!
//! `EncoderPlanBuilder::build` takes no I/O-bound input and is deterministic:
//! identical arguments always produce a byte-identical arglist.

use crate::errors::{AppError, AppResult};
use crate::models::channel::{Watermark, WatermarkPosition};
use crate::models::encoder::{ErrorAudioMode, OfflineScreenMode, OutputTarget};
use crate::models::{Channel, EncoderSettings, ProbeStats};

/// Why a plan has no real media source to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticReason {
    Offline,
    Error,
}

pub struct EncoderPlanInput<'a> {
    pub channel: &'a Channel,
    pub settings: &'a EncoderSettings,
    pub watermark: Option<&'a Watermark>,
    pub stream_duration_ms: i64,
    pub seek_ms: i64,
    pub audio_only: bool,
    pub title: Option<&'a str>,
    pub subtitle: Option<&'a str>,
    /// `Some` for real content; `None` triggers synthetic screen generation.
    pub source: Option<EncoderSource<'a>>,
    pub synthetic_reason: Option<SyntheticReason>,
}

pub struct EncoderSource<'a> {
    pub url: &'a str,
    pub probe: &'a ProbeStats,
}

pub struct EncoderPlanBuilder;

/// Accumulates `-filter_complex` segments, threading named pads between them.
struct FilterGraph {
    segments: Vec<String>,
    current_video: Option<String>,
    current_audio: Option<String>,
    counter: u32,
}

impl FilterGraph {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            current_video: None,
            current_audio: None,
            counter: 0,
        }
    }

    fn next_pad(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{}", self.counter)
    }

    fn init_video(&mut self, source_pad: &str) {
        self.current_video = Some(source_pad.to_string());
    }

    fn init_audio(&mut self, source_pad: &str) {
        self.current_audio = Some(source_pad.to_string());
    }

    fn push_video(&mut self, expr: &str) {
        let next = self.next_pad("v");
        let src = self.current_video.clone().expect("video pad initialised before use");
        self.segments.push(format!("[{src}]{expr}[{next}]"));
        self.current_video = Some(next);
    }

    fn push_audio(&mut self, expr: &str) {
        let next = self.next_pad("a");
        let src = self.current_audio.clone().expect("audio pad initialised before use");
        self.segments.push(format!("[{src}]{expr}[{next}]"));
        self.current_audio = Some(next);
    }

    /// Merges a second video pad into the current one via an overlay-style
    /// binary filter (e.g. watermark overlay).
    fn merge_video(&mut self, other_pad: &str, expr: &str) {
        let next = self.next_pad("v");
        let src = self.current_video.clone().expect("video pad initialised before use");
        self.segments.push(format!("[{src}][{other_pad}]{expr}[{next}]"));
        self.current_video = Some(next);
    }

    fn complex(&self) -> String {
        self.segments.join(";")
    }
}

impl EncoderPlanBuilder {
    pub fn build(input: &EncoderPlanInput<'_>) -> AppResult<Vec<String>> {
        if input.source.is_none() && input.synthetic_reason.is_none() {
            return Err(AppError::Configuration {
                message: "synthetic plan requested without a reason".to_string(),
            });
        }

        if input.source.is_none() && input.settings.offline_screen_mode == OfflineScreenMode::Kill {
            return Err(AppError::EncoderMissing {
                command: "kill mode: no encoder started for this item".to_string(),
            });
        }

        let mut args = Vec::new();
        args.push("-hide_banner".to_string());
        args.push("-nostdin".to_string());

        let mut graph = FilterGraph::new();

        let clamp_volume_to_70 = match &input.source {
            Some(source) => {
                Self::add_real_input(&mut args, &mut graph, input, source);
                false
            }
            None => Self::add_synthetic_input(&mut args, &mut graph, input),
        };

        if let Some(source) = &input.source {
            Self::apply_frame_rate_cap(&mut graph, input.settings, source.probe);
            Self::apply_deinterlace(&mut graph, input.settings, source.probe);
            Self::apply_resolution(&mut graph, input.settings, source.probe);
        }

        if let Some(watermark) = input.watermark {
            if watermark.enabled && !input.channel.disable_filler_overlay {
                Self::apply_watermark(&mut args, &mut graph, watermark, input.settings);
            }
        }

        let mut volume_percent = input.settings.volume_percent;
        if clamp_volume_to_70 {
            volume_percent = volume_percent.min(70);
        }
        if volume_percent != 100 {
            let vp = (volume_percent as f64 / 100.0 * 100.0).round() / 100.0;
            graph.push_audio(&format!("volume={vp:.2}"));
        }

        if input.settings.apad && !input.audio_only {
            graph.push_audio(&format!("apad=whole_dur={}ms", input.stream_duration_ms));
        }

        let filter_complex = graph.complex();
        if !filter_complex.is_empty() {
            if filter_complex.starts_with(';') {
                return Err(AppError::Configuration {
                    message: "filter_complex must not begin with ';'".to_string(),
                });
            }
            args.push("-filter_complex".to_string());
            args.push(filter_complex);
            if let Some(v) = &graph.current_video {
                args.push("-map".to_string());
                args.push(format!("[{v}]"));
            }
            if let Some(a) = &graph.current_audio {
                args.push("-map".to_string());
                args.push(format!("[{a}]"));
            }
        }

        Self::apply_codecs(&mut args, input);
        Self::apply_output(&mut args, input);

        Ok(args)
    }

    fn add_real_input(args: &mut Vec<String>, graph: &mut FilterGraph, input: &EncoderPlanInput<'_>, source: &EncoderSource<'_>) {
        args.push("-analyzeduration".to_string());
        args.push("10000000".to_string());
        args.push("-probesize".to_string());
        args.push("10000000".to_string());
        if input.seek_ms > 0 {
            args.push("-ss".to_string());
            args.push(format!("{:.3}", input.seek_ms as f64 / 1000.0));
        }
        args.push("-i".to_string());
        args.push(source.url.to_string());
        args.push("-t".to_string());
        args.push(format!("{:.3}", input.stream_duration_ms as f64 / 1000.0));

        graph.init_video("0:v");
        graph.init_audio("0:a");
    }

    /// Returns whether the chosen audio branch is subject to the ≤70% volume
    /// clamp (error-tone sine/whitenoise, or audio-only whitenoise).
    fn add_synthetic_input(args: &mut Vec<String>, graph: &mut FilterGraph, input: &EncoderPlanInput<'_>) -> bool {
        let (width, height) = Self::target_dims(input.settings);
        let duration_secs = input.stream_duration_ms as f64 / 1000.0;

        match input.settings.offline_screen_mode {
            OfflineScreenMode::Pic => {
                args.push("-f".to_string());
                args.push("lavfi".to_string());
                args.push("-i".to_string());
                args.push(format!("color=c=black:s={width}x{height}:d={duration_secs:.3}"));
                graph.init_video("0:v");
                graph.push_video("format=yuv420p");
                graph.push_video("loop=loop=-1:size=1:start=0");
                graph.push_video("realtime");
            }
            OfflineScreenMode::Static => {
                args.push("-f".to_string());
                args.push("lavfi".to_string());
                args.push("-i".to_string());
                args.push(format!("geq=random(1)*255:128:128:s={width}x{height}:d={duration_secs:.3}"));
                graph.init_video("0:v");
                graph.push_video("realtime");
            }
            OfflineScreenMode::Testsrc => {
                args.push("-f".to_string());
                args.push("lavfi".to_string());
                args.push("-i".to_string());
                args.push(format!("testsrc=size={width}x{height}:duration={duration_secs:.3}"));
                graph.init_video("0:v");
                graph.push_video("realtime");
            }
            OfflineScreenMode::Text => {
                args.push("-f".to_string());
                args.push("lavfi".to_string());
                args.push("-i".to_string());
                args.push(format!("color=c=black:s={width}x{height}:d={duration_secs:.3}"));
                graph.init_video("0:v");
                let title_size = (height as f64 / 22.0).ceil() as u32;
                let subtitle_size = (height as f64 / 33.0).ceil() as u32;
                let title = input.title.unwrap_or("Channel Offline").replace(':', "\\:");
                graph.push_video(&format!("drawtext=text='{title}':fontsize={title_size}:fontcolor=white:x=(w-text_w)/2:y=(h-text_h)/2-{subtitle_size}"));
                if let Some(subtitle) = input.subtitle {
                    let subtitle = subtitle.replace(':', "\\:");
                    graph.push_video(&format!("drawtext=text='{subtitle}':fontsize={subtitle_size}:fontcolor=gray:x=(w-text_w)/2:y=(h-text_h)/2+{title_size}"));
                }
            }
            OfflineScreenMode::Kill => unreachable!("handled before this point"),
        }

        // Audio: soundtrack loop for offline with configured soundtrack,
        // sine/whitenoise under error, silence otherwise.
        let use_soundtrack = input.synthetic_reason == Some(SyntheticReason::Offline)
            && input.channel.offline.fallback_soundtrack.is_some();

        if use_soundtrack {
            let soundtrack = input.channel.offline.fallback_soundtrack.as_deref().unwrap();
            args.push("-i".to_string());
            args.push(soundtrack.to_string());
            graph.init_audio("1:a");
            graph.push_audio("aloop=-1:size=2147483647");
            false
        } else if input.synthetic_reason == Some(SyntheticReason::Error) && input.settings.error_audio_mode == ErrorAudioMode::Sine {
            args.push("-f".to_string());
            args.push("lavfi".to_string());
            args.push("-i".to_string());
            args.push(format!("sine=f=440:d={duration_secs:.3}"));
            graph.init_audio("1:a");
            true
        } else if (input.synthetic_reason == Some(SyntheticReason::Error) && input.settings.error_audio_mode == ErrorAudioMode::WhiteNoise)
            || input.audio_only
        {
            args.push("-f".to_string());
            args.push("lavfi".to_string());
            args.push("-i".to_string());
            args.push(format!("aevalsrc=random(0):duration={duration_secs:.3}"));
            graph.init_audio("1:a");
            true
        } else {
            args.push("-f".to_string());
            args.push("lavfi".to_string());
            args.push("-i".to_string());
            args.push(format!("aevalsrc=0:duration={duration_secs:.3}"));
            graph.init_audio("1:a");
            false
        }
    }

    fn target_dims(settings: &EncoderSettings) -> (u32, u32) {
        (settings.target_width, settings.target_height)
    }

    fn apply_frame_rate_cap(graph: &mut FilterGraph, settings: &EncoderSettings, probe: &ProbeStats) {
        const EPSILON: f64 = 0.01;
        if probe.fps > settings.max_fps + EPSILON {
            graph.push_video(&format!("fps={}", settings.max_fps));
        }
    }

    fn apply_deinterlace(graph: &mut FilterGraph, settings: &EncoderSettings, probe: &ProbeStats) {
        if probe.scan_type == crate::models::probe::ScanType::Interlaced {
            if let Some(name) = settings.deinterlace_filter.filter_name() {
                graph.push_video(name);
            }
        }
    }

    fn apply_resolution(graph: &mut FilterGraph, settings: &EncoderSettings, probe: &ProbeStats) {
        if !settings.normalize_resolution {
            return;
        }
        let (w, h) = scale_to_fit(probe.width, probe.height, probe.sar_num.max(1), probe.sar_den.max(1), settings.target_width, settings.target_height);
        graph.push_video(&format!("scale={w}:{h}:force_original_aspect_ratio=1"));
        let pad_x = (settings.target_width.saturating_sub(w)) / 2;
        let pad_y = (settings.target_height.saturating_sub(h)) / 2;
        graph.push_video(&format!(
            "pad={}:{}:{pad_x}:{pad_y}:black",
            settings.target_width, settings.target_height
        ));
        graph.push_video("setsar=1");
    }

    fn apply_watermark(args: &mut Vec<String>, graph: &mut FilterGraph, watermark: &Watermark, settings: &EncoderSettings) {
        let Some(source) = watermark.url.as_ref().or(watermark.icon.as_ref()) else {
            return;
        };
        if watermark.animated {
            args.push("-ignore_loop".to_string());
            args.push("0".to_string());
        }
        args.push("-i".to_string());
        args.push(source.clone());
        // The watermark occupies the next ffmpeg input slot; addressed
        // positionally since it isn't part of the primary input's pad chain.
        let wm_src = "1:v".to_string();

        let mut pad_name = wm_src.clone();
        if !watermark.fixed_size {
            let scaled = graph.next_pad("wms");
            graph.segments.push(format!("[{wm_src}]scale=w={:.0}*iw/100:-1[{scaled}]", watermark.width_percent));
            pad_name = scaled;
        }

        let (x, y) = watermark_position_expr(watermark, settings);
        let mut overlay = format!("overlay=x={x}:y={y}");
        if watermark.duration_secs > 0 {
            overlay.push_str(&format!(":enable='between(t,0,{})'", watermark.duration_secs));
        }
        graph.merge_video(&pad_name, &overlay);
    }

    fn apply_codecs(args: &mut Vec<String>, input: &EncoderPlanInput<'_>) {
        let settings = input.settings;
        args.push("-c:v".to_string());
        if let Some(source) = &input.source {
            let transcode = settings.normalize_video_codec && !video_family_matches(&source.probe.video_codec, &settings.target_video_codec);
            if transcode {
                args.push(settings.target_video_codec.clone());
            } else {
                args.push("copy".to_string());
            }
        } else {
            args.push(settings.target_video_codec.clone());
            if settings.offline_screen_mode == OfflineScreenMode::Pic && wants_stillimage_tune(&settings.target_video_codec) {
                args.push("-tune".to_string());
                args.push("stillimage".to_string());
            }
        }

        args.push("-c:a".to_string());
        if let Some(source) = &input.source {
            let probed_audio = source.probe.audio_codec.as_deref().unwrap_or("");
            let transcode = settings.normalize_audio_codec && !audio_family_matches(probed_audio, &settings.target_audio_codec);
            if transcode {
                args.push(settings.target_audio_codec.clone());
            } else {
                args.push("copy".to_string());
            }
        } else {
            args.push(settings.target_audio_codec.clone());
        }

        if settings.normalize_audio_channels_sample_rate {
            args.push("-ar".to_string());
            args.push(settings.target_audio_sample_rate.to_string());
            args.push("-ac".to_string());
            args.push(settings.target_audio_channels.to_string());
        }
    }

    fn apply_output(args: &mut Vec<String>, input: &EncoderPlanInput<'_>) {
        match input.settings.output_target {
            OutputTarget::Mpegts => {
                args.push("-f".to_string());
                args.push("mpegts".to_string());
                args.push("-mpegts_copyts".to_string());
                args.push("1".to_string());
                args.push("-avoid_negative_ts".to_string());
                args.push("disabled".to_string());
                args.push("-y".to_string());
                args.push("pipe:1".to_string());
            }
            OutputTarget::Hls => {
                args.push("-f".to_string());
                args.push("hls".to_string());
                args.push("-hls_time".to_string());
                args.push(input.settings.hls_segment_duration_secs.to_string());
                args.push("-hls_delete_threshold".to_string());
                args.push(input.settings.hls_delete_threshold.to_string());
                args.push("-hls_flags".to_string());
                args.push("delete_segments".to_string());
                args.push(format!("{}/channel-{}.m3u8", input.settings.hls_segment_dir, input.channel.number));
            }
            OutputTarget::Dash => {
                args.push("-f".to_string());
                args.push("dash".to_string());
                args.push(format!("{}/channel-{}.mpd", input.settings.dash_segment_dir, input.channel.number));
            }
        }
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

/// Scales `(iw, ih)` corrected by sample aspect ratio to fit within
/// `(wanted_w, wanted_h)` while preserving aspect ratio, rounded to even.
fn scale_to_fit(iw: u32, ih: u32, sar_num: u32, sar_den: u32, wanted_w: u32, wanted_h: u32) -> (u32, u32) {
    let p = iw.saturating_mul(sar_num).max(1);
    let q = ih.saturating_mul(sar_den).max(1);
    let g = gcd(p, q);
    let (rp, rq) = (p / g, q / g);

    let mut w = wanted_w;
    let mut h = ((wanted_w as u64 * rq as u64) / rp as u64) as u32;
    if h > wanted_h {
        h = wanted_h;
        w = ((wanted_h as u64 * rp as u64) / rq as u64) as u32;
    }
    if w % 2 != 0 {
        w = w.saturating_sub(1);
    }
    if h % 2 != 0 {
        h = h.saturating_sub(1);
    }
    (w.max(2), h.max(2))
}

fn watermark_position_expr(watermark: &Watermark, settings: &EncoderSettings) -> (String, String) {
    let hm = format!("(main_w*{}/100)", watermark.horizontal_margin_percent);
    let vm = format!("(main_h*{}/100)", watermark.vertical_margin_percent);
    let _ = settings;
    match watermark.position {
        WatermarkPosition::TopLeft => (hm, vm),
        WatermarkPosition::TopRight => (format!("(main_w-overlay_w-{hm})"), vm),
        WatermarkPosition::BottomLeft => (hm, format!("(main_h-overlay_h-{vm})")),
        WatermarkPosition::BottomRight => (format!("(main_w-overlay_w-{hm})"), format!("(main_h-overlay_h-{vm})")),
    }
}

/// `264` ↔ h264, `265`/`hevc` ↔ hevc, `mpeg2` ↔ mpeg2; anything else is an
/// unknown pairing and always forces a transcode.
fn video_family_matches(probed_codec: &str, target_family: &str) -> bool {
    let probed = probed_codec.to_lowercase();
    match target_family.to_lowercase().as_str() {
        "h264" => probed.contains("264"),
        "hevc" | "h265" => probed.contains("265") || probed.contains("hevc"),
        "mpeg2" => probed.contains("mpeg2"),
        _ => false,
    }
}

/// Only these ffmpeg video encoders accept `-tune stillimage`.
fn wants_stillimage_tune(target_video_codec: &str) -> bool {
    matches!(target_video_codec.to_lowercase().as_str(), "mpeg2video" | "libx264" | "h264_videotoolbox")
}

fn audio_family_matches(probed_codec: &str, target_family: &str) -> bool {
    let probed = probed_codec.to_lowercase();
    match target_family.to_lowercase().as_str() {
        "mp3" => probed.contains("mp3") || probed.contains("lame"),
        "aac" => probed.contains("aac"),
        "ac3" => probed.contains("ac3"),
        "flac" => probed.contains("flac"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::probe::ScanType;
    use crate::models::{OfflinePolicy, TranscodeOverrides};
    use uuid::Uuid;

    fn channel() -> Channel {
        Channel {
            id: Uuid::new_v4(),
            number: 1,
            name: "Test".into(),
            group_title: None,
            start_time_ms: 0,
            duration_ms: 60_000,
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

    fn probe() -> ProbeStats {
        ProbeStats {
            width: 1280,
            height: 720,
            sar_num: 1,
            sar_den: 1,
            fps: 30.0,
            scan_type: ScanType::Progressive,
            video_codec: "h264".into(),
            audio_codec: Some("aac".into()),
            audio_stream_index: Some(1),
            has_video: true,
            has_audio: true,
        }
    }

    #[test]
    fn determinism_same_input_same_output() {
        let channel = channel();
        let settings = EncoderSettings::default();
        let probe = probe();
        let source = EncoderSource { url: "file:///a.mp4", probe: &probe };
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 30_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: Some(source),
            synthetic_reason: None,
        };

        let first = EncoderPlanBuilder::build(&input).unwrap();
        let second = EncoderPlanBuilder::build(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn matching_codec_family_is_copied() {
        let channel = channel();
        let settings = EncoderSettings::default();
        let probe = probe();
        let source = EncoderSource { url: "file:///a.mp4", probe: &probe };
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 30_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: Some(source),
            synthetic_reason: None,
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let v_idx = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[v_idx + 1], "copy");
    }

    #[test]
    fn mismatched_codec_forces_transcode() {
        let channel = channel();
        let settings = EncoderSettings::default();
        let mut probe = probe();
        probe.video_codec = "mpeg4".into();
        let source = EncoderSource { url: "file:///a.mp4", probe: &probe };
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 30_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: Some(source),
            synthetic_reason: None,
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let v_idx = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[v_idx + 1], "h264");
    }

    #[test]
    fn kill_mode_fails_instead_of_building_args() {
        let channel = channel();
        let mut settings = EncoderSettings::default();
        settings.offline_screen_mode = OfflineScreenMode::Kill;
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 30_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Offline),
        };
        let err = EncoderPlanBuilder::build(&input).unwrap_err();
        assert!(matches!(err, AppError::EncoderMissing { .. }));
    }

    #[test]
    fn filter_complex_never_starts_with_semicolon() {
        let channel = channel();
        let settings = EncoderSettings::default();
        let probe = probe();
        let source = EncoderSource { url: "file:///a.mp4", probe: &probe };
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 30_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: Some(source),
            synthetic_reason: None,
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        if let Some(idx) = args.iter().position(|a| a == "-filter_complex") {
            assert!(!args[idx + 1].starts_with(';'));
        }
    }

    #[test]
    fn gcd_reduces_correctly() {
        assert_eq!(gcd(48, 18), 6);
        assert_eq!(scale_to_fit(1280, 720, 1, 1, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn pic_mode_with_stillimage_encoder_selects_tune() {
        let channel = channel();
        let mut settings = EncoderSettings::default();
        settings.target_video_codec = "libx264".into();
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Offline),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let tune_idx = args.iter().position(|a| a == "-tune").expect("stillimage tune flag");
        assert_eq!(args[tune_idx + 1], "stillimage");
    }

    #[test]
    fn pic_mode_with_other_encoder_skips_tune() {
        let channel = channel();
        let settings = EncoderSettings::default();
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Offline),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        assert!(!args.iter().any(|a| a == "-tune"));
    }

    #[test]
    fn error_sine_audio_clamps_volume_to_70_percent() {
        let channel = channel();
        let mut settings = EncoderSettings::default();
        settings.error_audio_mode = ErrorAudioMode::Sine;
        settings.volume_percent = 100;
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Error),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[idx + 1].contains("volume=0.70"));
    }

    #[test]
    fn error_whitenoise_audio_clamps_volume_to_70_percent() {
        let channel = channel();
        let mut settings = EncoderSettings::default();
        settings.error_audio_mode = ErrorAudioMode::WhiteNoise;
        settings.volume_percent = 100;
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Error),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[idx + 1].contains("volume=0.70"));
    }

    #[test]
    fn configured_volume_below_clamp_still_applies_under_error_audio() {
        let channel = channel();
        let mut settings = EncoderSettings::default();
        settings.error_audio_mode = ErrorAudioMode::Sine;
        settings.volume_percent = 40;
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Error),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(args[idx + 1].contains("volume=0.40"));
    }

    #[test]
    fn offline_soundtrack_audio_is_not_clamped() {
        let mut channel = channel();
        channel.offline.fallback_soundtrack = Some("file:///loop.mp3".into());
        let mut settings = EncoderSettings::default();
        settings.volume_percent = 100;
        let input = EncoderPlanInput {
            channel: &channel,
            settings: &settings,
            watermark: None,
            stream_duration_ms: 60_000,
            seek_ms: 0,
            audio_only: false,
            title: None,
            subtitle: None,
            source: None,
            synthetic_reason: Some(SyntheticReason::Offline),
        };
        let args = EncoderPlanBuilder::build(&input).unwrap();
        let has_volume_filter = args
            .iter()
            .position(|a| a == "-filter_complex")
            .is_some_and(|idx| args[idx + 1].contains("volume="));
        assert!(!has_volume_filter);
    }
}
