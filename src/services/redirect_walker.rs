//! Follows `redirect` lineup items across channels, bounding the final
//! stream duration by every hop's remaining time on the way back out.

use std::collections::HashSet;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::LineupItem;
use crate::services::lineup_resolver::{LineupResolver, ResolvedItem};
use crate::store::{ChannelRef, Store};

pub struct RedirectWalker;

/// A resolved, non-redirect item plus the tightest stream-duration bound
/// accumulated across every redirect hop taken to reach it.
#[derive(Debug, Clone)]
pub struct WalkedItem {
    pub channel_id: Uuid,
    pub resolved: ResolvedItem,
    pub stream_duration_ms: i64,
}

impl RedirectWalker {
    pub async fn walk(store: &dyn Store, start_channel_id: Uuid, now_ms: i64) -> AppResult<WalkedItem> {
        let mut visited = HashSet::new();
        let mut bounds = Vec::new();
        let mut current_id = start_channel_id;

        loop {
            if !visited.insert(current_id) {
                let path = bounds
                    .iter()
                    .map(|(id, _): &(Uuid, i64)| id.to_string())
                    .chain(std::iter::once(current_id.to_string()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(AppError::RedirectCycle { path });
            }

            let (channel, lineup) = store.load_channel_and_lineup(ChannelRef::Id(current_id)).await?;
            let resolved = LineupResolver::resolve(&channel, &lineup, now_ms)?;

            match &resolved.item {
                LineupItem::Redirect { channel_id, duration_ms } => {
                    let remaining = duration_ms - resolved.time_into_item_ms;
                    bounds.push((current_id, remaining));
                    current_id = *channel_id;
                }
                _ => {
                    let mut stream_duration_ms = match &resolved.item {
                        LineupItem::Content { duration_ms, .. } | LineupItem::Offline { duration_ms } => {
                            duration_ms - resolved.time_into_item_ms
                        }
                        LineupItem::Redirect { .. } => unreachable!(),
                    };

                    for (_, bound) in bounds.iter().rev() {
                        stream_duration_ms = stream_duration_ms.min(*bound + resolved.beginning_offset_ms);
                    }

                    return Ok(WalkedItem {
                        channel_id: current_id,
                        resolved,
                        stream_duration_ms,
                    });
                }
            }
        }
    }
}
