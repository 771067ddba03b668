//! Lineup items: the ordered, looping schedule a channel plays.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::program::ProgramKey;

/// A single slot in a channel's lineup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineupItem {
    Content {
        program: ProgramKey,
        duration_ms: i64,
    },
    Redirect {
        channel_id: Uuid,
        duration_ms: i64,
    },
    Offline {
        duration_ms: i64,
    },
}

impl LineupItem {
    pub fn duration_ms(&self) -> i64 {
        match self {
            LineupItem::Content { duration_ms, .. } => *duration_ms,
            LineupItem::Redirect { duration_ms, .. } => *duration_ms,
            LineupItem::Offline { duration_ms } => *duration_ms,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, LineupItem::Offline { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, LineupItem::Redirect { .. })
    }
}
