//! In-memory playback bookkeeping kept by PlaybackCache.

use std::collections::HashMap;

use uuid::Uuid;

/// `{channelNumber -> {itemKey -> lastPlayedAt}}` style record, kept generic
/// over the key type so both lineup items and filler groups can reuse it.
#[derive(Debug, Clone, Default)]
pub struct PlaybackRecord<K> {
    pub by_channel: HashMap<u32, HashMap<K, i64>>,
}

impl<K: std::hash::Hash + Eq + Clone> PlaybackRecord<K> {
    pub fn last_played(&self, channel: u32, key: &K) -> Option<i64> {
        self.by_channel.get(&channel).and_then(|m| m.get(key)).copied()
    }

    pub fn record(&mut self, channel: u32, key: K, at_ms: i64) {
        let channel_map = self.by_channel.entry(channel).or_default();
        let entry = channel_map.entry(key).or_insert(at_ms);
        if at_ms > *entry {
            *entry = at_ms;
        }
    }
}

/// Keys a filler clip or collection can be tracked by.
pub type ClipKey = Uuid;
pub type CollectionKey = Uuid;
