//! Content items backed by an upstream source (movies, episodes, filler tracks).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramType {
    Movie,
    Episode,
    Track,
}

/// A content item uniquely keyed by `(sourceType, externalSourceId, externalKey)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramKey {
    pub source_type: String,
    pub external_source_id: String,
    pub external_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub key: ProgramKey,
    pub program_type: ProgramType,
    pub duration_ms: i64,
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
    pub rating: Option<String>,
    pub icon: Option<String>,
    pub summary: Option<String>,
    pub file_path: Option<String>,
}
