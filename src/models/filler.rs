//! Filler shows: pools of short clips used to pad offline gaps.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::program::ProgramKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerClip {
    pub program: ProgramKey,
    pub duration_ms: i64,
    pub source_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerShow {
    pub id: Uuid,
    pub name: String,
    pub clips: Vec<FillerClip>,
}

/// A channel's weighted reference to a filler show, with a per-channel cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerCollectionRef {
    pub filler_show_id: Uuid,
    pub weight: f64,
    /// Milliseconds this collection must sit unplayed on the channel before reuse.
    pub cooldown_ms: i64,
}
