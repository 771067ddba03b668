//! Channel configuration: lineup anchor, watermark, offline policy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::filler::FillerCollectionRef;

/// How a channel fills time when no real content is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineMode {
    Clip,
    Pic,
}

/// Static fallback content shown when offline and no filler is eligible.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OfflinePolicy {
    pub mode: OfflineMode,
    /// A fallback soundtrack path/URL played under a static picture.
    pub fallback_soundtrack: Option<String>,
    /// A fallback still picture path/URL shown in `pic` mode.
    pub fallback_picture: Option<String>,
    /// A fallback clip program id shown in `clip` mode when filler lottery is empty.
    pub fallback_clip: Option<Uuid>,
}

impl Default for OfflineMode {
    fn default() -> Self {
        OfflineMode::Pic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watermark {
    pub enabled: bool,
    pub url: Option<String>,
    pub icon: Option<String>,
    /// Width as a percentage of the output frame width.
    pub width_percent: f64,
    pub vertical_margin_percent: f64,
    pub horizontal_margin_percent: f64,
    pub position: WatermarkPosition,
    /// Seconds the watermark is shown for; 0 means forever.
    pub duration_secs: u32,
    pub fixed_size: bool,
    pub animated: bool,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            icon: None,
            width_percent: 10.0,
            vertical_margin_percent: 2.0,
            horizontal_margin_percent: 2.0,
            position: WatermarkPosition::BottomRight,
            duration_secs: 0,
            fixed_size: false,
            animated: false,
        }
    }
}

/// Per-channel transcode overrides layered on top of the encoder defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TranscodeOverrides {
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub buffer_size_kbps: Option<u32>,
}

/// A channel's full configuration as owned by the Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub number: u32,
    pub name: String,
    pub group_title: Option<String>,
    /// Epoch milliseconds; the anchor against which the lineup loops.
    pub start_time_ms: i64,
    /// Total milliseconds of the lineup; the lineup repeats modulo this.
    pub duration_ms: i64,
    pub icon: Option<String>,
    pub watermark: Watermark,
    pub offline: OfflinePolicy,
    pub transcode: TranscodeOverrides,
    /// Hidden from channel guides but still streamable.
    pub stealth: bool,
    pub filler_collections: Vec<FillerCollectionRef>,
    pub disable_filler_overlay: bool,
    /// Milliseconds a filler clip must sit unplayed before it can repeat.
    pub filler_repeat_cooldown_ms: i64,
}

impl Channel {
    /// `elapsedInLoop = (now - startTime) mod duration`.
    pub fn elapsed_in_loop(&self, now_ms: i64) -> i64 {
        let delta = now_ms - self.start_time_ms;
        delta.rem_euclid(self.duration_ms.max(1))
    }
}
