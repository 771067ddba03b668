//! Business logic for the channel streaming core: lineup resolution, filler
//! selection, redirect following, encoder plan/process management and the
//! concat-driven session controller built on top of them.

pub mod concat_session;
pub mod encoder_plan_builder;
pub mod encoder_process;
pub mod filler_picker;
pub mod lineup_resolver;
pub mod playback_cache;
pub mod redirect_walker;
pub mod stream_controller;

pub use concat_session::{build_playlist_manifest, ConcatSessionRegistry, StreamQueryParams, DEFAULT_MAX_ATTEMPTS};
pub use encoder_plan_builder::{EncoderPlanBuilder, EncoderPlanInput, EncoderSource, SyntheticReason};
pub use encoder_process::{EncoderExitKind, EncoderProcess, EncoderState};
pub use filler_picker::{FillerPickResult, FillerPicker, PickedFiller};
pub use lineup_resolver::{LineupResolver, ResolvedItem};
pub use playback_cache::PlaybackCache;
pub use redirect_walker::{RedirectWalker, WalkedItem};
pub use stream_controller::{executable_exists, PreparedStream, StreamController, StreamRequest};
