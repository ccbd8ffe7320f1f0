//! Platform API interception
//!
//! Rewrites outbound playback manifest requests so the platform offers
//! subtitle tracks in a text format we can fetch, and harvests the track
//! catalog from inbound responses. Both hooks take arbitrary JSON and
//! must never fail: a response we don't recognize passes through
//! untouched.

use crate::bridge::{PageBridge, PageEvent};
use crate::session::Session;
use crate::types::{RawTrack, SubtitleTrack};
use serde_json::Value;
use std::sync::Arc;

/// Downloadable text format requested from the platform.
pub const WEBVTT_FORMAT: &str = "webvtt-lssdh-ios8";

/// Known entries of the playback `profiles` array. An array is treated
/// as a profile list if any member matches.
pub const PLATFORM_PROFILES: &[&str] = &[
    "heaac-2-dash",
    "heaac-2hq-dash",
    "playready-h264mpl30-dash",
    "playready-h264mpl31-dash",
    "playready-h264hpl30-dash",
    "playready-h264hpl31-dash",
    "vp9-profile0-L30-dash-cenc",
    "vp9-profile0-L31-dash-cenc",
    "dfxp-ls-sdh",
    "simplesdh",
    "nflx-cmisc",
    "BIF240",
    "BIF320",
];

pub struct Interceptor {
    session: Arc<Session>,
    bridge: Arc<PageBridge>,
}

impl Interceptor {
    pub fn new(session: Arc<Session>, bridge: Arc<PageBridge>) -> Self {
        Self { session, bridge }
    }

    /// Outbound hook. Walks the request body looking for the playback
    /// profile list and prepends [`WEBVTT_FORMAT`] to the first one found.
    pub fn on_encode(&self, body: &mut Value) {
        Self::inject_profile(body, None);
    }

    fn inject_profile(value: &mut Value, key: Option<&str>) -> bool {
        match value {
            Value::Array(items) => {
                if Self::is_profile_list(key, items) {
                    if !items.iter().any(|v| v.as_str() == Some(WEBVTT_FORMAT)) {
                        items.insert(0, Value::String(WEBVTT_FORMAT.to_string()));
                        tracing::debug!("injected subtitle format into profile list");
                    }
                    return true;
                }
                items
                    .iter_mut()
                    .any(|item| Self::inject_profile(item, None))
            }
            Value::Object(map) => map
                .iter_mut()
                .any(|(k, v)| Self::inject_profile(v, Some(k.as_str()))),
            _ => false,
        }
    }

    fn is_profile_list(key: Option<&str>, items: &[Value]) -> bool {
        if key == Some("profiles") {
            return true;
        }
        items.iter().any(|item| {
            item.as_str()
                .map(|s| PLATFORM_PROFILES.contains(&s))
                .unwrap_or(false)
        })
    }

    /// Inbound hook. Extracts the subtitle track catalog of every movie
    /// the response carries and records them on the session. Returns
    /// whether any tracks were found, so the caller can kick off
    /// reconciliation.
    pub fn on_decode(&self, body: &Value) -> bool {
        let mut found = false;
        for (movie_id, raw_tracks) in Self::find_track_lists(body) {
            let tracks = Self::usable_tracks(raw_tracks);
            if tracks.is_empty() {
                tracing::debug!(movie_id, "response carried no usable subtitle tracks");
                self.bridge.publish(PageEvent::NoTracks {
                    message: "No subtitle tracks available for this title".to_string(),
                });
                continue;
            }
            tracing::info!(movie_id, count = tracks.len(), "subtitle tracks harvested");
            self.session.tracks.insert(movie_id, tracks.clone());
            self.bridge.publish(PageEvent::TracksAvailable { movie_id, tracks });
            found = true;
        }
        found
    }

    /// The catalog appears in three response shapes, which are not
    /// mutually exclusive: `result`, `result.result`, and every entry of
    /// the `result.movies` map.
    fn find_track_lists(body: &Value) -> Vec<(u64, &Value)> {
        let Some(result) = body.get("result") else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if let Some(node) = Self::movie_node(result) {
            found.push(node);
        }
        if let Some(node) = result.get("result").and_then(Self::movie_node) {
            found.push(node);
        }
        if let Some(movies) = result.get("movies").and_then(Value::as_object) {
            found.extend(movies.values().filter_map(Self::movie_node));
        }
        found
    }

    fn movie_node(node: &Value) -> Option<(u64, &Value)> {
        let movie_id = node.get("movieId").and_then(Value::as_u64)?;
        let tracks = node.get("timedtexttracks")?;
        tracks.is_array().then_some((movie_id, tracks))
    }

    fn usable_tracks(raw: &Value) -> Vec<SubtitleTrack> {
        let Some(items) = raw.as_array() else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let track: RawTrack = serde_json::from_value(item.clone()).ok()?;
                Self::convert_track(track)
            })
            .collect()
    }

    fn convert_track(track: RawTrack) -> Option<SubtitleTrack> {
        if track.is_forced_narrative || track.is_none_track {
            return None;
        }
        let id = track.new_track_id?;
        let language = track.language?;
        let url = track
            .tt_downloadables
            .get(WEBVTT_FORMAT)?
            .urls
            .first()
            .map(|u| u.url.clone())
            .filter(|u| !u.is_empty())?;
        Some(SubtitleTrack {
            id,
            language,
            language_description: track.language_description.unwrap_or_default(),
            url,
            is_closed_captions: track.raw_track_type.as_deref() == Some("closedcaptions"),
        })
    }
}
