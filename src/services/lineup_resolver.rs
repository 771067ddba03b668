//! Resolves which lineup item is on the air for a channel at a given instant.

use crate::errors::{AppError, AppResult};
use crate::models::{Channel, LineupItem};

/// 9.9 s tolerance used for boundary smoothing and cooldown fuzzing.
pub const SLACK_MS: i64 = 9_900;
/// Below this much elapsed-into-item, snap the join point back to zero.
pub const START_SNAP_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub index: i64,
    pub item: LineupItem,
    /// How far into the item playback should begin, after boundary smoothing
    /// and start-snap have been applied.
    pub time_into_item_ms: i64,
    /// The pre-snap elapsed time, when start-snap fired; 0 otherwise.
    pub beginning_offset_ms: i64,
}

pub struct LineupResolver;

impl LineupResolver {
    /// `now_ms` is epoch milliseconds. Fails with `LineupEmpty` or
    /// `LineupDurationMismatch` if the lineup doesn't match the channel's
    /// declared invariants.
    pub fn resolve(channel: &Channel, lineup: &[LineupItem], now_ms: i64) -> AppResult<ResolvedItem> {
        if lineup.is_empty() {
            return Err(AppError::LineupEmpty { channel: channel.number });
        }

        let summed: i64 = lineup.iter().map(|item| item.duration_ms()).sum();
        if (summed - channel.duration_ms).abs() > SLACK_MS {
            return Err(AppError::LineupDurationMismatch {
                channel: channel.number,
                declared_ms: channel.duration_ms,
                actual_ms: summed,
            });
        }

        if now_ms < channel.start_time_ms {
            return Ok(ResolvedItem {
                index: -1,
                item: LineupItem::Offline {
                    duration_ms: channel.start_time_ms - now_ms,
                },
                time_into_item_ms: 0,
                beginning_offset_ms: 0,
            });
        }

        let elapsed = channel.elapsed_in_loop(now_ms);

        let mut running = 0i64;
        let mut index = 0usize;
        let mut time_into_item = elapsed;
        for (i, item) in lineup.iter().enumerate() {
            let duration = item.duration_ms();
            if running + duration > elapsed {
                index = i;
                time_into_item = elapsed - running;
                break;
            }
            running += duration;
            index = i;
        }
        // Accounts for rounding at the very end of the loop: fall back to
        // the last item rather than panic if nothing matched exactly.
        if running + lineup[index].duration_ms() <= elapsed {
            time_into_item = lineup[index].duration_ms();
        }

        let n = lineup.len();
        let item_duration = lineup[index].duration_ms();
        let (mut index, mut time_into_item) = (index, time_into_item);
        if item_duration > 2 * SLACK_MS && time_into_item > item_duration - SLACK_MS {
            index = (index + 1) % n;
            time_into_item = 0;
        }

        let mut beginning_offset = 0;
        if time_into_item < START_SNAP_MS {
            beginning_offset = time_into_item;
            time_into_item = 0;
        }

        Ok(ResolvedItem {
            index: index as i64,
            item: lineup[index].clone(),
            time_into_item_ms: time_into_item,
            beginning_offset_ms: beginning_offset,
        })
    }
}
