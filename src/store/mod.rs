//! The minimal read interface the core needs from the persistent store.
//!
//! Everything about how channels, programs, lineups and filler shows are
//! created, edited, or persisted lives outside the core; this module only
//! defines the read contract it depends on, plus an in-memory implementation
//! used by tests (and by the `airtime` binary when no richer store is wired up).

pub mod media;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Channel, EncoderSettings, FillerShow, LineupItem};

pub use media::{FfprobeMediaResolver, MediaResolver, ResolvedMedia};
pub use memory::MemoryStore;

/// A channel can be addressed by either its UUID or its user-facing number.
#[derive(Debug, Clone, Copy)]
pub enum ChannelRef {
    Id(Uuid),
    Number(u32),
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRef::Id(id) => write!(f, "{id}"),
            ChannelRef::Number(n) => write!(f, "{n}"),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_channel(&self, channel: ChannelRef) -> AppResult<Channel>;

    async fn load_lineup(&self, channel_id: Uuid) -> AppResult<Vec<LineupItem>>;

    async fn load_channel_and_lineup(&self, channel: ChannelRef) -> AppResult<(Channel, Vec<LineupItem>)> {
        let channel = self.get_channel(channel).await?;
        let lineup = self.load_lineup(channel.id).await?;
        Ok((channel, lineup))
    }

    async fn filler_show(&self, id: Uuid) -> AppResult<FillerShow>;

    async fn ffmpeg_settings(&self) -> EncoderSettings;
}

pub(crate) fn not_found(channel: ChannelRef) -> AppError {
    AppError::not_found(channel.to_string())
}
