use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChannelRef, Store, not_found};
use crate::errors::AppResult;
use crate::models::{Channel, EncoderSettings, FillerShow, LineupItem};

/// On-disk shape of a channel-definitions file: everything the in-memory
/// store needs, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelDefinitions {
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// `channel_id -> ordered lineup`.
    #[serde(default)]
    pub lineups: HashMap<Uuid, Vec<LineupItem>>,
    #[serde(default)]
    pub filler_shows: Vec<FillerShow>,
    #[serde(default)]
    pub encoder_settings: EncoderSettings,
}

/// Read-only (from the core's perspective) in-memory implementation of
/// [`Store`]. Built once from a [`ChannelDefinitions`] snapshot; interior
/// mutability is not needed since the core never writes back.
pub struct MemoryStore {
    channels_by_id: HashMap<Uuid, Channel>,
    channels_by_number: HashMap<u32, Uuid>,
    lineups: HashMap<Uuid, Vec<LineupItem>>,
    filler_shows: HashMap<Uuid, FillerShow>,
    encoder_settings: RwLock<EncoderSettings>,
}

impl MemoryStore {
    pub fn new(definitions: ChannelDefinitions) -> Self {
        let mut channels_by_id = HashMap::new();
        let mut channels_by_number = HashMap::new();
        for channel in definitions.channels {
            channels_by_number.insert(channel.number, channel.id);
            channels_by_id.insert(channel.id, channel);
        }

        let filler_shows = definitions
            .filler_shows
            .into_iter()
            .map(|show| (show.id, show))
            .collect();

        Self {
            channels_by_id,
            channels_by_number,
            lineups: definitions.lineups,
            filler_shows,
            encoder_settings: RwLock::new(definitions.encoder_settings),
        }
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let definitions: ChannelDefinitions = toml::from_str(text)?;
        Ok(Self::new(definitions))
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        if !std::path::Path::new(path).exists() {
            tracing::warn!("channel definitions file '{}' not found, starting with an empty store", path);
            return Ok(Self::new(ChannelDefinitions::default()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn resolve(&self, channel: ChannelRef) -> Option<&Channel> {
        match channel {
            ChannelRef::Id(id) => self.channels_by_id.get(&id),
            ChannelRef::Number(number) => self
                .channels_by_number
                .get(&number)
                .and_then(|id| self.channels_by_id.get(id)),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_channel(&self, channel: ChannelRef) -> AppResult<Channel> {
        self.resolve(channel).cloned().ok_or_else(|| not_found(channel))
    }

    async fn load_lineup(&self, channel_id: Uuid) -> AppResult<Vec<LineupItem>> {
        Ok(self.lineups.get(&channel_id).cloned().unwrap_or_default())
    }

    async fn filler_show(&self, id: Uuid) -> AppResult<FillerShow> {
        self.filler_shows
            .get(&id)
            .cloned()
            .ok_or_else(|| crate::errors::AppError::not_found(id.to_string()))
    }

    async fn ffmpeg_settings(&self) -> EncoderSettings {
        self.encoder_settings.read().expect("encoder settings lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineupItem, OfflinePolicy, TranscodeOverrides, Watermark};

    fn sample_channel(number: u32) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            number,
            name: format!("Channel {number}"),
            group_title: None,
            start_time_ms: 0,
            duration_ms: 210_000,
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

    #[tokio::test]
    async fn resolves_by_number_and_id() {
        let channel = sample_channel(7);
        let id = channel.id;
        let mut lineups = HashMap::new();
        lineups.insert(id, vec![LineupItem::Offline { duration_ms: 210_000 }]);

        let store = MemoryStore::new(ChannelDefinitions {
            channels: vec![channel],
            lineups,
            filler_shows: vec![],
            encoder_settings: EncoderSettings::default(),
        });

        let by_number = store.get_channel(ChannelRef::Number(7)).await.unwrap();
        assert_eq!(by_number.id, id);

        let by_id = store.get_channel(ChannelRef::Id(id)).await.unwrap();
        assert_eq!(by_id.number, 7);

        let lineup = store.load_lineup(id).await.unwrap();
        assert_eq!(lineup.len(), 1);
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let store = MemoryStore::new(ChannelDefinitions::default());
        let err = store.get_channel(ChannelRef::Number(99)).await.unwrap_err();
        assert!(matches!(err, crate::errors::AppError::NotFound { .. }));
    }
}
