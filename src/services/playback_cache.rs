//! In-memory last-played bookkeeping plus the per-session attempt throttle.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::playback::{ClipKey, CollectionKey, PlaybackRecord};

/// Two independent last-played maps (lineup items, filler collections) plus a
/// per-session failure counter, all behind one lock per map as the core's
/// concurrency model calls for (reads/writes are O(1), no cross-request
/// transcoder sharing touches this beyond timestamp bookkeeping).
///
/// Sessions are keyed by the same incrementing `u64` ConcatSession hands out
/// in the `/stream?session=` query parameter.
#[derive(Default)]
pub struct PlaybackCache {
    clips: RwLock<PlaybackRecord<ClipKey>>,
    collections: RwLock<PlaybackRecord<CollectionKey>>,
    session_attempts: RwLock<HashMap<u64, u32>>,
}

impl PlaybackCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_played_clip(&self, channel: u32, clip: &ClipKey) -> Option<i64> {
        self.clips.read().expect("playback cache poisoned").last_played(channel, clip)
    }

    pub fn record_clip(&self, channel: u32, clip: ClipKey, at_ms: i64) {
        self.clips.write().expect("playback cache poisoned").record(channel, clip, at_ms);
    }

    pub fn last_played_collection(&self, channel: u32, collection: &CollectionKey) -> Option<i64> {
        self.collections
            .read()
            .expect("playback cache poisoned")
            .last_played(channel, collection)
    }

    pub fn record_collection(&self, channel: u32, collection: CollectionKey, at_ms: i64) {
        self.collections
            .write()
            .expect("playback cache poisoned")
            .record(channel, collection, at_ms);
    }

    pub fn record_attempt(&self, session_id: u64) -> u32 {
        let mut attempts = self.session_attempts.write().expect("playback cache poisoned");
        let counter = attempts.entry(session_id).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn reset_session(&self, session_id: u64) {
        self.session_attempts.write().expect("playback cache poisoned").remove(&session_id);
    }

    pub fn attempt_count(&self, session_id: u64) -> u32 {
        self.session_attempts
            .read()
            .expect("playback cache poisoned")
            .get(&session_id)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn records_are_monotonic_per_channel() {
        let cache = PlaybackCache::new();
        let clip = Uuid::new_v4();
        cache.record_clip(1, clip, 1_000);
        cache.record_clip(1, clip, 500);
        assert_eq!(cache.last_played_clip(1, &clip), Some(1_000));
        cache.record_clip(1, clip, 2_000);
        assert_eq!(cache.last_played_clip(1, &clip), Some(2_000));
    }

    #[test]
    fn session_attempts_increment_and_reset() {
        let cache = PlaybackCache::new();
        let session = 7u64;
        assert_eq!(cache.record_attempt(session), 1);
        assert_eq!(cache.record_attempt(session), 2);
        assert_eq!(cache.attempt_count(session), 2);
        cache.reset_session(session);
        assert_eq!(cache.attempt_count(session), 0);
    }
}
