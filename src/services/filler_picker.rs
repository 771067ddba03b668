//! Two-level weighted lottery that fills an offline gap with a filler clip.

use rand::Rng;
use uuid::Uuid;

use crate::models::channel::OfflineMode;
use crate::models::{Channel, FillerClip, FillerShow};
use crate::services::lineup_resolver::SLACK_MS;
use crate::services::playback_cache::PlaybackCache;

/// "Never played" is treated as having happened this long ago.
const NEVER_PLAYED_MS: i64 = 7 * 24 * 60 * 60 * 1000;
const FIVE_HOURS_MS: i64 = 5 * 60 * 60 * 1000;
/// Cap applied to the final "nothing at all fits" fallback screen.
pub const FINAL_FALLBACK_CAP_MS: i64 = 10 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct PickedFiller {
    pub collection_id: Uuid,
    pub clip: FillerClip,
    pub stream_duration_ms: i64,
    /// Non-zero only on a first-join shuffle.
    pub start_offset_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FillerPickResult {
    pub filler: Option<PickedFiller>,
    /// If no filler is eligible, the caller should shorten the offline gap to
    /// this many milliseconds and re-resolve.
    pub minimum_wait_ms: i64,
}

pub struct FillerPicker;

impl FillerPicker {
    pub fn pick(
        channel: &Channel,
        shows: &[&FillerShow],
        cache: &PlaybackCache,
        now_ms: i64,
        remaining_ms: i64,
        is_first_join: bool,
    ) -> FillerPickResult {
        let mut rng = rand::thread_rng();
        Self::pick_with_rng(channel, shows, cache, now_ms, remaining_ms, is_first_join, &mut rng)
    }

    pub fn pick_with_rng<R: Rng>(
        channel: &Channel,
        shows: &[&FillerShow],
        cache: &PlaybackCache,
        now_ms: i64,
        remaining_ms: i64,
        is_first_join: bool,
        rng: &mut R,
    ) -> FillerPickResult {
        let mut minimum_wait_ms = i64::MAX;
        let mut eligible_collections: Vec<(usize, f64)> = Vec::new();

        for (idx, collection) in channel.filler_collections.iter().enumerate() {
            let last_played = cache.last_played_collection(channel.number, &collection.filler_show_id);
            let time_since = last_played.map(|t| now_ms - t).unwrap_or(i64::MAX);
            if time_since >= collection.cooldown_ms {
                eligible_collections.push((idx, collection.weight));
            } else {
                let shortfall = collection.cooldown_ms - time_since;
                minimum_wait_ms = minimum_wait_ms.min(shortfall);
            }
        }

        let chosen_idx = weighted_reservoir_pick(eligible_collections.into_iter(), rng);

        if let Some(idx) = chosen_idx {
            let collection = &channel.filler_collections[idx];
            let Some(show) = shows.iter().find(|s| s.id == collection.filler_show_id) else {
                return Self::fallback(channel, minimum_wait_ms);
            };

            let mut eligible_clips: Vec<(usize, f64)> = Vec::new();
            for (clip_idx, clip) in show.clips.iter().enumerate() {
                if clip.duration_ms > remaining_ms + SLACK_MS {
                    continue;
                }
                let last_played = cache.last_played_clip(channel.number, &clip.program_key_uuid());
                let time_since = last_played.map(|t| now_ms - t).unwrap_or(NEVER_PLAYED_MS);
                let cooldown_floor = channel.filler_repeat_cooldown_ms - SLACK_MS;
                if time_since < cooldown_floor {
                    let shortfall = cooldown_floor - time_since;
                    if clip.duration_ms + shortfall <= remaining_ms + SLACK_MS {
                        minimum_wait_ms = minimum_wait_ms.min(shortfall);
                    }
                    continue;
                }
                let weight = norm_s(time_since.min(FIVE_HOURS_MS)) + norm_d(clip.duration_ms);
                eligible_clips.push((clip_idx, weight));
            }

            if let Some(clip_idx) = weighted_reservoir_pick(eligible_clips.into_iter(), rng) {
                let clip = show.clips[clip_idx].clone();
                let start_offset_ms = if is_first_join {
                    let span = (clip.duration_ms - remaining_ms - 15_000 - SLACK_MS).max(0);
                    if span > 0 { rng.gen_range(0..=span) } else { 0 }
                } else {
                    0
                };
                return FillerPickResult {
                    filler: Some(PickedFiller {
                        collection_id: collection.filler_show_id,
                        stream_duration_ms: clip.duration_ms.min(remaining_ms + SLACK_MS),
                        clip,
                        start_offset_ms,
                    }),
                    minimum_wait_ms: 0,
                };
            }
        }

        Self::fallback(channel, minimum_wait_ms)
    }

    fn fallback(channel: &Channel, minimum_wait_ms: i64) -> FillerPickResult {
        if channel.offline.mode == OfflineMode::Clip {
            if let Some(fallback_id) = channel.offline.fallback_clip {
                return FillerPickResult {
                    filler: Some(PickedFiller {
                        collection_id: fallback_id,
                        clip: FillerClip {
                            program: crate::models::program::ProgramKey {
                                source_type: "fallback".into(),
                                external_source_id: channel.id.to_string(),
                                external_key: fallback_id.to_string(),
                            },
                            duration_ms: FINAL_FALLBACK_CAP_MS,
                            source_url: channel
                                .offline
                                .fallback_soundtrack
                                .clone()
                                .unwrap_or_default(),
                        },
                        stream_duration_ms: FINAL_FALLBACK_CAP_MS,
                        start_offset_ms: 0,
                    }),
                    minimum_wait_ms: 0,
                };
            }
        }

        FillerPickResult {
            filler: None,
            minimum_wait_ms: if minimum_wait_ms == i64::MAX { FINAL_FALLBACK_CAP_MS } else { minimum_wait_ms },
        }
    }
}

/// `norm_d(d_ms)`: weight contribution from a clip's raw duration.
fn norm_d(d_ms: i64) -> f64 {
    let mut x = d_ms as f64 / 60_000.0;
    if x >= 3.0 {
        x = 3.0 + x.ln();
    }
    ((10_000.0 * (1000.0 * x).ceil() + 10_000.0) / 1_000_000.0).ceil() + 1.0
}

/// `norm_s(s_ms)`: weight contribution from how long since a clip last played.
fn norm_s(s_ms: i64) -> f64 {
    let inner = (s_ms as f64 / 600.0).ceil() + 1.0;
    ((inner * inner) / 1_000_000.0).ceil() + 1.0
}

/// Running-sum weighted reservoir sampling: `L += w`, accept with
/// probability `w / L`. Accepting the last item with weight 0 never wins
/// unless it's the only candidate (probability 0 means "never accept").
fn weighted_reservoir_pick<R: Rng>(items: impl Iterator<Item = (usize, f64)>, rng: &mut R) -> Option<usize> {
    let mut chosen = None;
    let mut total = 0.0;
    for (idx, weight) in items {
        if weight <= 0.0 {
            continue;
        }
        total += weight;
        if rng.gen::<f64>() < weight / total {
            chosen = Some(idx);
        }
    }
    chosen
}

/// `FillerClip` doesn't carry its own stable UUID — callers key playback
/// history off of a deterministic derivation from its program key instead.
impl FillerClip {
    pub fn program_key_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        let digest = format!(
            "{}:{}:{}",
            self.program.source_type, self.program.external_source_id, self.program.external_key
        );
        for (i, b) in digest.bytes().enumerate().take(16) {
            bytes[i % 16] ^= b;
        }
        Uuid::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::filler::FillerCollectionRef;
    use crate::models::program::ProgramKey;
    use crate::models::{OfflinePolicy, TranscodeOverrides, Watermark};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn channel_with_collection(show_id: Uuid, cooldown_ms: i64) -> Channel {
        Channel {
            id: Uuid::new_v4(),
            number: 1,
            name: "Test".into(),
            group_title: None,
            start_time_ms: 0,
            duration_ms: 1,
            icon: None,
            watermark: Watermark::default(),
            offline: OfflinePolicy::default(),
            transcode: TranscodeOverrides::default(),
            stealth: false,
            filler_collections: vec![FillerCollectionRef {
                filler_show_id: show_id,
                weight: 1.0,
                cooldown_ms: 0,
            }],
            disable_filler_overlay: false,
            filler_repeat_cooldown_ms: cooldown_ms,
        }
    }

    #[test]
    fn s4_offline_plus_filler_single_candidate() {
        let show_id = Uuid::new_v4();
        let clip = FillerClip {
            program: ProgramKey {
                source_type: "filler".into(),
                external_source_id: "1".into(),
                external_key: "clip-a".into(),
            },
            duration_ms: 30_000,
            source_url: "file:///clip-a.mp4".into(),
        };
        let show = FillerShow { id: show_id, name: "Show".into(), clips: vec![clip] };
        let channel = channel_with_collection(show_id, 0);
        let cache = PlaybackCache::new();
        let mut rng = StdRng::seed_from_u64(1);

        let result = FillerPicker::pick_with_rng(&channel, &[&show], &cache, 0, 300_000, false, &mut rng);
        let filler = result.filler.expect("a candidate should have been picked");
        assert_eq!(filler.stream_duration_ms, 30_000);
    }

    #[test]
    fn no_candidate_reports_minimum_wait() {
        let show_id = Uuid::new_v4();
        let clip = FillerClip {
            program: ProgramKey {
                source_type: "filler".into(),
                external_source_id: "1".into(),
                external_key: "clip-a".into(),
            },
            duration_ms: 30_000,
            source_url: "file:///clip-a.mp4".into(),
        };
        let show = FillerShow { id: show_id, name: "Show".into(), clips: vec![clip] };
        let channel = channel_with_collection(show_id, 0);
        let cache = PlaybackCache::new();
        // Every clip too long for a tiny remaining gap.
        let mut rng = StdRng::seed_from_u64(2);
        let result = FillerPicker::pick_with_rng(&channel, &[&show], &cache, 0, 1, false, &mut rng);
        assert!(result.filler.is_none());
    }

    #[test]
    fn norm_d_is_monotonic_for_small_durations() {
        assert!(norm_d(60_000) <= norm_d(120_000));
    }
}
