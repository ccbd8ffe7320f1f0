//! Cross-context messaging
//!
//! Two independent channels with no business logic:
//! - page context ↔ extension context, a `type`/`action`/`data` envelope
//!   over the window messaging primitive, origin allow-listed;
//! - extension context ↔ UI surface, the same logical events translated
//!   into `success`/`error` response objects.
//!
//! Unrecognized messages are ignored, never errored.

use crate::types::{FusionStats, MovieId, SmartSubSettings, SubtitleTrack};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Envelope `type` on outbound page events.
pub const PAGE_EVENT_TYPE: &str = "SMART_SUBTITLES";

/// Envelope `type` on inbound page requests.
pub const PAGE_REQUEST_TYPE: &str = "SMART_SUBTITLES_REQUEST";

/// Events the page script publishes outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data")]
pub enum PageEvent {
    #[serde(rename = "TRACKS_AVAILABLE")]
    TracksAvailable {
        #[serde(rename = "movieId")]
        movie_id: MovieId,
        tracks: Vec<SubtitleTrack>,
    },
    #[serde(rename = "NO_TRACKS")]
    NoTracks { message: String },
    #[serde(rename = "DOWNLOAD_SUCCESS")]
    DownloadSuccess { filename: String },
    #[serde(rename = "DOWNLOAD_ERROR")]
    DownloadError { error: String },
    #[serde(rename = "SMART_SUBTITLES_SUCCESS")]
    SmartSubsSuccess { stats: Option<FusionStats> },
    #[serde(rename = "SMART_SUBTITLES_ERROR")]
    SmartSubsError { error: String },
}

/// Requests the extension context sends into the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data")]
pub enum PageRequest {
    #[serde(rename = "GET_TRACKS")]
    GetTracks,
    #[serde(rename = "DOWNLOAD_SUBTITLE")]
    DownloadSubtitle {
        #[serde(rename = "trackId")]
        track_id: String,
    },
    #[serde(rename = "PROCESS_SMART_SUBTITLES")]
    ProcessSmartSubtitles { settings: SmartSubSettings },
}

/// Page-context end of the window messaging channel.
pub struct PageBridge {
    allowed_origins: Vec<String>,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl PageBridge {
    pub fn new(allowed_origins: Vec<String>) -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                allowed_origins,
                events,
            },
            rx,
        )
    }

    /// Publish an event outward. A closed receiver is not an error; the
    /// extension context may simply not be listening yet.
    pub fn publish(&self, event: PageEvent) {
        tracing::debug!(?event, "publishing page event");
        let _ = self.events.send(event);
    }

    /// Validate an inbound window message. Requires an allow-listed origin,
    /// the request envelope `type`, and a recognized `action`; anything
    /// else yields `None` and is dropped silently.
    pub fn accept(&self, origin: &str, message: &Value) -> Option<PageRequest> {
        if !self.allowed_origins.iter().any(|o| o == origin) {
            tracing::debug!(origin, "ignoring message from disallowed origin");
            return None;
        }
        if message.get("type").and_then(Value::as_str) != Some(PAGE_REQUEST_TYPE) {
            return None;
        }
        serde_json::from_value(message.clone()).ok()
    }

    /// Wrap an event in its wire envelope.
    pub fn envelope(event: &PageEvent) -> Value {
        let mut value = serde_json::to_value(event).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(PAGE_EVENT_TYPE.to_string()));
        }
        value
    }
}

/// Requests arriving from the UI surface over the extension channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UiRequest {
    CheckPage,
    GetSubtitles,
    DownloadSubtitle { track_id: String },
    ProcessSmartSubtitles { settings: SmartSubSettings },
}

/// Response object on the extension channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<SubtitleTrack>>,
    #[serde(rename = "movieId", skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<MovieId>,
}

impl UiResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn unknown_action() -> Self {
        Self {
            success: false,
            error: Some("Unknown action".to_string()),
            ..Default::default()
        }
    }
}

/// Extension-context relay between the UI surface and the page script.
///
/// Holds only the latest page snapshot; every action is forwarded to the
/// page over the window channel.
pub struct ExtensionBridge {
    tracks: Mutex<Vec<SubtitleTrack>>,
    movie_id: Mutex<Option<MovieId>>,
    to_page: mpsc::UnboundedSender<PageRequest>,
}

impl ExtensionBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PageRequest>) {
        let (to_page, rx) = mpsc::unbounded_channel();
        (
            Self {
                tracks: Mutex::new(Vec::new()),
                movie_id: Mutex::new(None),
                to_page,
            },
            rx,
        )
    }

    /// Update the snapshot from a page event.
    pub fn observe(&self, event: &PageEvent) {
        match event {
            PageEvent::TracksAvailable { movie_id, tracks } => {
                *self.tracks.lock() = tracks.clone();
                *self.movie_id.lock() = Some(*movie_id);
            }
            PageEvent::NoTracks { .. } => {
                self.tracks.lock().clear();
            }
            _ => {}
        }
    }

    /// Handle a UI request, forwarding to the page where needed.
    pub fn handle(&self, request: UiRequest) -> UiResponse {
        match request {
            UiRequest::CheckPage => UiResponse::ok("Page ready"),
            UiRequest::GetSubtitles => {
                let _ = self.to_page.send(PageRequest::GetTracks);
                UiResponse {
                    success: true,
                    tracks: Some(self.tracks.lock().clone()),
                    movie_id: *self.movie_id.lock(),
                    ..Default::default()
                }
            }
            UiRequest::DownloadSubtitle { track_id } => {
                let _ = self.to_page.send(PageRequest::DownloadSubtitle { track_id });
                UiResponse::ok("Download request sent")
            }
            UiRequest::ProcessSmartSubtitles { settings } => {
                let _ = self
                    .to_page
                    .send(PageRequest::ProcessSmartSubtitles { settings });
                UiResponse::ok("Smart subtitles processing started")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track() -> SubtitleTrack {
        SubtitleTrack {
            id: "T:1".to_string(),
            language: "fr".to_string(),
            language_description: "French".to_string(),
            url: "https://cdn.example/fr.vtt".to_string(),
            is_closed_captions: false,
        }
    }

    fn bridge() -> (PageBridge, mpsc::UnboundedReceiver<PageEvent>) {
        PageBridge::new(vec!["https://www.netflix.com".to_string()])
    }

    #[test]
    fn test_accept_valid_request() {
        let (bridge, _rx) = bridge();
        let message = json!({
            "type": "SMART_SUBTITLES_REQUEST",
            "action": "DOWNLOAD_SUBTITLE",
            "data": { "trackId": "T:1" }
        });
        let request = bridge.accept("https://www.netflix.com", &message);
        assert_eq!(
            request,
            Some(PageRequest::DownloadSubtitle {
                track_id: "T:1".to_string()
            })
        );
    }

    #[test]
    fn test_accept_rejects_bad_origin() {
        let (bridge, _rx) = bridge();
        let message = json!({ "type": "SMART_SUBTITLES_REQUEST", "action": "GET_TRACKS" });
        assert_eq!(bridge.accept("https://evil.example", &message), None);
    }

    #[test]
    fn test_accept_ignores_unknown_shape() {
        let (bridge, _rx) = bridge();
        let origin = "https://www.netflix.com";
        assert_eq!(bridge.accept(origin, &json!({ "type": "OTHER" })), None);
        assert_eq!(
            bridge.accept(
                origin,
                &json!({ "type": "SMART_SUBTITLES_REQUEST", "action": "NOT_A_THING" })
            ),
            None
        );
        assert_eq!(bridge.accept(origin, &json!("not even an object")), None);
    }

    #[test]
    fn test_publish_and_envelope() {
        let (bridge, mut rx) = bridge();
        bridge.publish(PageEvent::DownloadSuccess {
            filename: "subtitle_1_fr.srt".to_string(),
        });
        let event = rx.try_recv().unwrap();
        let envelope = PageBridge::envelope(&event);
        assert_eq!(envelope["type"], "SMART_SUBTITLES");
        assert_eq!(envelope["action"], "DOWNLOAD_SUCCESS");
        assert_eq!(envelope["data"]["filename"], "subtitle_1_fr.srt");
    }

    #[test]
    fn test_extension_bridge_snapshot_and_forward() {
        let (bridge, mut rx) = ExtensionBridge::new();
        bridge.observe(&PageEvent::TracksAvailable {
            movie_id: 12345,
            tracks: vec![track()],
        });

        let response = bridge.handle(UiRequest::GetSubtitles);
        assert!(response.success);
        assert_eq!(response.movie_id, Some(12345));
        assert_eq!(response.tracks.unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap(), PageRequest::GetTracks);

        bridge.observe(&PageEvent::NoTracks {
            message: "No tracks available".to_string(),
        });
        let response = bridge.handle(UiRequest::GetSubtitles);
        assert_eq!(response.tracks.unwrap().len(), 0);
    }

    #[test]
    fn test_ui_request_wire_names() {
        let request: UiRequest =
            serde_json::from_value(json!({ "action": "downloadSubtitle", "track_id": "T:9" }))
                .unwrap();
        assert_eq!(
            request,
            UiRequest::DownloadSubtitle {
                track_id: "T:9".to_string()
            }
        );
        assert!(serde_json::from_value::<UiRequest>(json!({ "action": "selfDestruct" })).is_err());
    }

    #[test]
    fn test_ui_response_omits_empty_fields() {
        let value = serde_json::to_value(UiResponse::ok("done")).unwrap();
        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
        assert!(value.get("tracks").is_none());
    }
}
