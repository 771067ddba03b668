//! Configuration default values, kept in one place so they're easy to change.

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

// Storage defaults
pub const DEFAULT_HLS_PATH: &str = "./data/hls";
pub const DEFAULT_DASH_PATH: &str = "./data/dash";
pub const DEFAULT_SEGMENT_RETENTION: &str = "1h";
pub const DEFAULT_SEGMENT_CLEANUP_INTERVAL: &str = "5m";

// Encoder defaults
pub const DEFAULT_FFMPEG_COMMAND: &str = "ffmpeg";
pub const DEFAULT_FFPROBE_COMMAND: &str = "ffprobe";
pub const DEFAULT_HWACCEL_PREFERENCE: &[&str] = &["vaapi", "nvenc", "qsv"];

// Channel store defaults
pub const DEFAULT_CHANNELS_PATH: &str = "./data/channels.toml";

// Lineup/time-math defaults
pub const DEFAULT_SLACK_MS: i64 = 9_900;
pub const DEFAULT_START_SNAP_MS: i64 = 30_000;
