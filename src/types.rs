//! Core data types: platform wire shapes and engine-side track/session state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric movie identifier used by the platform (`data-videoid`, `movieId`).
pub type MovieId = u64;

/// Opaque track identifier (`new_track_id` on the wire).
pub type TrackId = String;

/// A usable subtitle track extracted from a platform response.
///
/// Immutable once constructed; identity is `id` scoped to its owning movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub id: TrackId,
    pub language: String,
    pub language_description: String,
    /// First delivery URL of the negotiated WebVTT downloadable.
    #[serde(rename = "bestUrl")]
    pub url: String,
    pub is_closed_captions: bool,
}

/// Session state for the currently playing movie.
///
/// Replaced wholesale (never mutated field-by-field) on movie change so no
/// stale cross-references survive the switch.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSession {
    pub movie_id: MovieId,
    pub selected_track_id: Option<TrackId>,
}

impl MovieSession {
    pub fn new(movie_id: MovieId) -> Self {
        Self {
            movie_id,
            selected_track_id: None,
        }
    }
}

/// Learner settings persisted by the UI surface (extension storage schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSubSettings {
    pub target_language: String,
    pub native_language: String,
    /// How many of the most frequent target-language words the learner knows.
    pub vocabulary_level: u32,
    pub enabled: bool,
}

/// Processing statistics returned by the fusion API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionStats {
    pub total_subtitles: u32,
    pub replaced_subtitles: u32,
    pub replacement_rate: f64,
    pub processing_time: f64,
}

/// Raw track descriptor as it appears inside `timedtexttracks`.
///
/// Every field is defaulted: the platform contract is opaque and versioned,
/// so a missing or oddly-typed field must never fail the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(rename = "languageDescription", default)]
    pub language_description: Option<String>,
    #[serde(rename = "new_track_id", default)]
    pub new_track_id: Option<String>,
    #[serde(rename = "isForcedNarrative", default)]
    pub is_forced_narrative: bool,
    #[serde(rename = "isNoneTrack", default)]
    pub is_none_track: bool,
    #[serde(rename = "rawTrackType", default)]
    pub raw_track_type: Option<String>,
    #[serde(rename = "ttDownloadables", default)]
    pub tt_downloadables: HashMap<String, RawDownloadable>,
}

/// One downloadable format entry under `ttDownloadables`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDownloadable {
    #[serde(default)]
    pub urls: Vec<RawUrl>,
}

/// One delivery URL entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUrl {
    #[serde(default)]
    pub url: String,
}
