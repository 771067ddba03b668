//! Probe stats as reported by the upstream MediaResolver for a content URL.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Progressive,
    Interlaced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeStats {
    pub width: u32,
    pub height: u32,
    /// Pixel (sample) aspect ratio numerator/denominator, e.g. 1:1 for square pixels.
    pub sar_num: u32,
    pub sar_den: u32,
    pub fps: f64,
    pub scan_type: ScanType,
    /// Lowercase codec name as reported by the prober, e.g. "h264", "hevc".
    pub video_codec: String,
    pub audio_codec: Option<String>,
    pub audio_stream_index: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl ProbeStats {
    pub fn audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }
}
