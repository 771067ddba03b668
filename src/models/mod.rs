//! Data model for the channel streaming core: channels, programs, lineups,
//! filler, playback bookkeeping, probe stats and encoder settings.

pub mod channel;
pub mod encoder;
pub mod filler;
pub mod lineup;
pub mod playback;
pub mod probe;
pub mod program;

pub use channel::{Channel, OfflineMode, OfflinePolicy, TranscodeOverrides, Watermark, WatermarkPosition};
pub use encoder::{DeinterlaceFilter, EncoderSettings, ErrorAudioMode, OfflineScreenMode, OutputTarget};
pub use filler::{FillerClip, FillerCollectionRef, FillerShow};
pub use lineup::LineupItem;
pub use playback::{ClipKey, CollectionKey, PlaybackRecord};
pub use probe::{ProbeStats, ScanType};
pub use program::{Program, ProgramKey, ProgramType};
