//! MediaResolver: the out-of-core collaborator that turns a Program/FillerClip
//! reference into a playable URL plus probe stats. The core only consumes
//! this through the trait below; how URLs are resolved and probed is an
//! external concern.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::models::probe::ScanType;
use crate::models::program::ProgramKey;
use crate::models::ProbeStats;

#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub url: String,
    pub probe: ProbeStats,
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve_content(&self, program: &ProgramKey) -> AppResult<ResolvedMedia>;
    async fn resolve_url(&self, url: &str) -> AppResult<ResolvedMedia>;
}

/// Probes a plain file path/URL via `ffprobe -show_streams -show_format`.
/// Content resolution (mapping a `ProgramKey` to a URL) is left to the Store
/// layer in this deployment; `resolve_content` probes `key.external_key`
/// directly, treating it as the playable URL.
pub struct FfprobeMediaResolver {
    ffprobe_command: String,
    timeout: Duration,
}

impl FfprobeMediaResolver {
    pub fn new(ffprobe_command: impl Into<String>) -> Self {
        Self { ffprobe_command: ffprobe_command.into(), timeout: Duration::from_secs(10) }
    }
}

#[async_trait]
impl MediaResolver for FfprobeMediaResolver {
    async fn resolve_content(&self, program: &ProgramKey) -> AppResult<ResolvedMedia> {
        self.resolve_url(&program.external_key).await
    }

    async fn resolve_url(&self, url: &str) -> AppResult<ResolvedMedia> {
        debug!("probing {url}");
        let mut cmd = Command::new(&self.ffprobe_command);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
            "-analyzeduration",
            "5000000",
            "-probesize",
            "5000000",
            url,
        ]);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AppError::Other(anyhow::anyhow!("ffprobe timeout after {:?} probing {url}", self.timeout)))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AppError::EncoderMissing { command: self.ffprobe_command.clone() }
                } else {
                    AppError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("ffprobe failed for {url}: {stderr}");
            return Err(AppError::Other(anyhow::anyhow!("ffprobe failed for {url}: {stderr}")));
        }

        let raw: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::Other(anyhow::anyhow!("failed to parse ffprobe output for {url}: {e}")))?;

        Ok(ResolvedMedia { url: url.to_string(), probe: raw.into_probe_stats() })
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    sample_aspect_ratio: Option<String>,
    r_frame_rate: Option<String>,
    field_order: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    index: u32,
}

impl FfprobeOutput {
    fn into_probe_stats(self) -> ProbeStats {
        let video = self.streams.iter().find(|s| s.codec_type.as_deref() == Some("video"));
        let audio = self.streams.iter().find(|s| s.codec_type.as_deref() == Some("audio"));

        let (sar_num, sar_den) = video
            .and_then(|v| v.sample_aspect_ratio.as_deref())
            .and_then(parse_ratio)
            .unwrap_or((1, 1));
        let fps = video.and_then(|v| v.r_frame_rate.as_deref()).and_then(parse_frame_rate).unwrap_or(25.0);
        let scan_type = match video.and_then(|v| v.field_order.as_deref()) {
            Some("progressive") | None => ScanType::Progressive,
            Some(_) => ScanType::Interlaced,
        };

        ProbeStats {
            width: video.and_then(|v| v.width).unwrap_or(0),
            height: video.and_then(|v| v.height).unwrap_or(0),
            sar_num,
            sar_den,
            fps,
            scan_type,
            video_codec: video.and_then(|v| v.codec_name.clone()).unwrap_or_default(),
            audio_codec: audio.and_then(|a| a.codec_name.clone()),
            audio_stream_index: audio.map(|a| a.index),
            has_video: video.is_some(),
            has_audio: audio.is_some(),
        }
    }
}

fn parse_ratio(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once(':')?;
    Some((num.parse().ok()?, den.parse().ok()?))
}

fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        Some(num / den)
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sar_ratio() {
        assert_eq!(parse_ratio("1:1"), Some((1, 1)));
        assert_eq!(parse_ratio("4:3"), Some((4, 3)));
        assert_eq!(parse_ratio("bogus"), None);
    }

    #[test]
    fn parses_frame_rate_fraction() {
        assert_eq!(parse_frame_rate("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
    }
}
