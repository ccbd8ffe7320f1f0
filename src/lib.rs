//! Smart-subtitles engine.
//!
//! A vocabulary-graded subtitle engine for a streaming platform: it
//! intercepts the platform's playback API to surface subtitle tracks in
//! a fetchable text format, converts between WebVTT and SRT, fuses a
//! target-language track with the viewer's native-language track through
//! a remote service, and renders the result over the player. The page
//! environment is abstracted behind traits so the whole engine is
//! testable off-page.

pub mod bridge;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod fusion;
pub mod intercept;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use config::EngineConfig;
pub use error::{EngineError, FusionError, Result};
pub use pipeline::Pipeline;
pub use session::{Session, Tracker};
pub use types::{MovieId, SmartSubSettings, SubtitleTrack, TrackId};
