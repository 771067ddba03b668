//! The infinite-stream trick: an `ffconcat v1.0` manifest with two entries
//! that both loop back into `/stream`, so the concat muxer keeps reopening
//! the URL rather than the core holding a long-lived encoder.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::services::playback_cache::PlaybackCache;

/// Default threshold for the per-session "too many attempts" throttle.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Hands out process-wide incrementing session ids, one per `/playlist` call.
#[derive(Default)]
pub struct ConcatSessionRegistry {
    counter: AtomicU64,
}

impl ConcatSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_session_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct StreamQueryParams {
    pub audio_only: bool,
    pub hls: bool,
}

/// Builds the two-entry ffconcat manifest text for `/playlist?channel=N`.
pub fn build_playlist_manifest(base_url: &str, channel_number: u32, session: u64, params: &StreamQueryParams) -> String {
    let mut query = format!("channel={channel_number}&session={session}");
    if params.audio_only {
        query.push_str("&audioOnly=1");
    }
    if params.hls {
        query.push_str("&hls=1");
    }
    let entry = format!("{base_url}/stream?{query}");

    format!("ffconcat version 1.0\nfile '{entry}'\nfile '{entry}'\n")
}

/// Whether a client's session has crossed the per-session attempt throttle;
/// StreamController substitutes a 60s offline item instead of resolving
/// normally once this returns `true`.
pub fn is_throttled(cache: &PlaybackCache, session_id: u64, max_attempts: u32) -> bool {
    cache.attempt_count(session_id) >= max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_increment_monotonically() {
        let registry = ConcatSessionRegistry::new();
        let a = registry.next_session_id();
        let b = registry.next_session_id();
        let c = registry.next_session_id();
        assert_eq!([a, b, c], [1, 2, 3]);
    }

    #[test]
    fn manifest_has_two_identical_entries() {
        let manifest = build_playlist_manifest(
            "http://localhost:8080",
            7,
            42,
            &StreamQueryParams { audio_only: false, hls: false },
        );
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines[0], "ffconcat version 1.0");
        assert_eq!(lines[1], lines[2]);
        assert!(lines[1].contains("channel=7"));
        assert!(lines[1].contains("session=42"));
    }

    #[test]
    fn audio_only_and_hls_flags_propagate_into_query() {
        let manifest = build_playlist_manifest(
            "http://localhost:8080",
            1,
            1,
            &StreamQueryParams { audio_only: true, hls: true },
        );
        assert!(manifest.contains("audioOnly=1"));
        assert!(manifest.contains("hls=1"));
    }

    #[test]
    fn throttle_trips_after_max_attempts() {
        let cache = PlaybackCache::new();
        let session = 99u64;
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            cache.record_attempt(session);
        }
        assert!(is_throttled(&cache, session, DEFAULT_MAX_ATTEMPTS));
    }

    #[test]
    fn throttle_does_not_trip_below_threshold() {
        let cache = PlaybackCache::new();
        let session = 100u64;
        cache.record_attempt(session);
        assert!(!is_throttled(&cache, session, DEFAULT_MAX_ATTEMPTS));
    }
}
