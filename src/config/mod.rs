use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
        }
    }
}

/// Encoder executables and hardware-acceleration preferences consulted by
/// EncoderPlanBuilder and EncoderProcess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default = "default_ffmpeg_command")]
    pub ffmpeg_command: String,
    #[serde(default = "default_ffprobe_command")]
    pub ffprobe_command: String,
    /// `-analyzeduration`/`-probesize` passed for every input, in microseconds/bytes.
    #[serde(default = "default_analyzeduration")]
    pub analyzeduration: u64,
    #[serde(default = "default_probesize")]
    pub probesize: u64,
    /// Ordered hwaccel names to try, most preferred first.
    #[serde(default = "default_hwaccel_preference")]
    pub hwaccel_preference: Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_command: default_ffmpeg_command(),
            ffprobe_command: default_ffprobe_command(),
            analyzeduration: default_analyzeduration(),
            probesize: default_probesize(),
            hwaccel_preference: default_hwaccel_preference(),
        }
    }
}

/// Directories the concat-driven streaming path writes segments into, managed
/// through `sandboxed_file_manager` so retention is enforced automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_hls_path")]
    pub hls_path: String,
    #[serde(default = "default_dash_path")]
    pub dash_path: String,
    #[serde(default = "default_segment_retention")]
    pub segment_retention: String,
    #[serde(default = "default_segment_cleanup_interval")]
    pub segment_cleanup_interval: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            hls_path: default_hls_path(),
            dash_path: default_dash_path(),
            segment_retention: default_segment_retention(),
            segment_cleanup_interval: default_segment_cleanup_interval(),
        }
    }
}

/// Points at the channel/lineup/filler definitions loaded into the in-memory Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_channels_path")]
    pub definitions_path: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            definitions_path: default_channels_path(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_ffmpeg_command() -> String {
    DEFAULT_FFMPEG_COMMAND.to_string()
}
fn default_ffprobe_command() -> String {
    DEFAULT_FFPROBE_COMMAND.to_string()
}
fn default_analyzeduration() -> u64 {
    10_000_000
}
fn default_probesize() -> u64 {
    10_000_000
}
fn default_hwaccel_preference() -> Vec<String> {
    DEFAULT_HWACCEL_PREFERENCE.iter().map(|s| s.to_string()).collect()
}
fn default_hls_path() -> String {
    DEFAULT_HLS_PATH.to_string()
}
fn default_dash_path() -> String {
    DEFAULT_DASH_PATH.to_string()
}
fn default_segment_retention() -> String {
    DEFAULT_SEGMENT_RETENTION.to_string()
}
fn default_segment_cleanup_interval() -> String {
    DEFAULT_SEGMENT_CLEANUP_INTERVAL.to_string()
}
fn default_channels_path() -> String {
    DEFAULT_CHANNELS_PATH.to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if !std::path::Path::new(config_file).exists() {
            tracing::warn!("config file '{}' not found, using default configuration values", config_file);
            let config: Config = Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Env::prefixed("AIRTIME_").split("__"))
                .extract()?;
            return Ok(config);
        }

        let config: Config = Figment::new()
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("AIRTIME_").split("__"))
            .extract()?;

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            encoder: EncoderConfig::default(),
            storage: StorageConfig::default(),
            channels: ChannelsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = Config::default();
        assert_eq!(config.web.port, DEFAULT_PORT);
        assert_eq!(config.encoder.hwaccel_preference, vec!["vaapi", "nvenc", "qsv"]);
    }
}
