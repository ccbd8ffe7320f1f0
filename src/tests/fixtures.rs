//! Shared test doubles: an in-memory page environment, canned subtitle
//! fetchers, and scriptable fusion/settings backends.

use crate::cache::SubtitleFetcher;
use crate::config::EngineConfig;
use crate::error::{EngineError, FusionError, Result};
use crate::fusion::{FusionApi, FusionResponse};
use crate::render::{NodeId, PageDom};
use crate::session::Session;
use crate::types::{FusionStats, MovieId, SmartSubSettings};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const FR_VTT: &str =
    "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nBonjour le monde\n\n00:00:03.000 --> 00:00:04.000\nAu revoir\n";
pub const EN_VTT: &str =
    "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello world\n\n00:00:03.000 --> 00:00:04.000\nGoodbye\n";
pub const FUSED_SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n\n";

struct TrackState {
    blob_url: String,
}

struct OverlayState {
    anchor: NodeId,
    cues: Vec<String>,
    visible: bool,
}

#[derive(Default)]
struct DomState {
    movie: Option<MovieId>,
    video_present: bool,
    next_id: NodeId,
    blob_seq: u64,
    selectors: HashMap<String, NodeId>,
    player_like: Vec<(NodeId, String)>,
    blobs: HashMap<String, (Bytes, bool)>,
    tracks: HashMap<NodeId, TrackState>,
    overlays: HashMap<NodeId, OverlayState>,
}

/// In-memory [`PageDom`] with inspection helpers.
pub struct FakeDom {
    state: Mutex<DomState>,
}

impl FakeDom {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DomState {
                video_present: true,
                ..Default::default()
            }),
        }
    }

    pub fn set_movie(&self, movie: Option<MovieId>) {
        self.state.lock().movie = movie;
    }

    pub fn set_video_present(&self, present: bool) {
        self.state.lock().video_present = present;
    }

    /// Register an element matched by `selector`.
    pub fn add_selector(&self, selector: &str) -> NodeId {
        let mut state = self.state.lock();
        let node = Self::next_node(&mut state);
        state.selectors.insert(selector.to_string(), node);
        node
    }

    /// Register an element found by the class-based player heuristic.
    pub fn add_player_like(&self, class: &str) -> NodeId {
        let mut state = self.state.lock();
        let node = Self::next_node(&mut state);
        state.player_like.push((node, class.to_string()));
        node
    }

    pub fn live_tracks(&self) -> usize {
        self.state.lock().tracks.len()
    }

    pub fn live_overlays(&self) -> usize {
        self.state.lock().overlays.len()
    }

    /// Blob URL of the single live track. Panics unless exactly one track
    /// element exists.
    pub fn only_track_blob(&self) -> String {
        let state = self.state.lock();
        assert_eq!(state.tracks.len(), 1, "expected exactly one track element");
        state.tracks.values().next().unwrap().blob_url.clone()
    }

    /// Content behind the single live track's blob URL.
    pub fn only_track_content(&self) -> String {
        let state = self.state.lock();
        assert_eq!(state.tracks.len(), 1, "expected exactly one track element");
        let blob_url = &state.tracks.values().next().unwrap().blob_url;
        let (content, _) = state.blobs.get(blob_url).unwrap();
        String::from_utf8_lossy(content).into_owned()
    }

    pub fn blob_revoked(&self, url: &str) -> bool {
        self.state
            .lock()
            .blobs
            .get(url)
            .map(|(_, revoked)| *revoked)
            .unwrap_or(false)
    }

    /// Cue texts currently shown on the live overlay, empty when there is
    /// no overlay.
    pub fn overlay_texts(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .overlays
            .values()
            .next()
            .map(|o| o.cues.clone())
            .unwrap_or_default()
    }

    pub fn overlay_anchor(&self) -> Option<NodeId> {
        self.state.lock().overlays.values().next().map(|o| o.anchor)
    }

    pub fn overlay_visible(&self) -> bool {
        self.state
            .lock()
            .overlays
            .values()
            .next()
            .map(|o| o.visible)
            .unwrap_or(false)
    }

    fn next_node(state: &mut DomState) -> NodeId {
        state.next_id += 1;
        state.next_id
    }
}

impl PageDom for FakeDom {
    fn movie_id_attr(&self) -> Option<MovieId> {
        self.state.lock().movie
    }

    fn video_present(&self) -> bool {
        self.state.lock().video_present
    }

    fn create_blob_url(&self, content: Bytes) -> String {
        let mut state = self.state.lock();
        state.blob_seq += 1;
        let url = format!("blob:fake/{}", state.blob_seq);
        state.blobs.insert(url.clone(), (content, false));
        url
    }

    fn revoke_blob_url(&self, url: &str) -> bool {
        let mut state = self.state.lock();
        match state.blobs.get_mut(url) {
            Some((_, revoked)) if !*revoked => {
                *revoked = true;
                true
            }
            _ => false,
        }
    }

    fn insert_track(&self, blob_url: &str, _language: &str) -> NodeId {
        let mut state = self.state.lock();
        let node = Self::next_node(&mut state);
        state.tracks.insert(
            node,
            TrackState {
                blob_url: blob_url.to_string(),
            },
        );
        node
    }

    fn remove_node(&self, node: NodeId) {
        let mut state = self.state.lock();
        state.tracks.remove(&node);
        state.overlays.remove(&node);
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.state.lock().selectors.get(selector).copied()
    }

    fn player_like_elements(&self) -> Vec<(NodeId, String)> {
        self.state.lock().player_like.clone()
    }

    fn insert_overlay(&self, anchor: NodeId) -> NodeId {
        let mut state = self.state.lock();
        let node = Self::next_node(&mut state);
        state.overlays.insert(
            node,
            OverlayState {
                anchor,
                cues: Vec::new(),
                visible: true,
            },
        );
        node
    }

    fn set_overlay_cues(&self, overlay: NodeId, cue_html: &[String]) {
        if let Some(state) = self.state.lock().overlays.get_mut(&overlay) {
            state.cues = cue_html.to_vec();
        }
    }

    fn set_overlay_visible(&self, overlay: NodeId, visible: bool) {
        if let Some(state) = self.state.lock().overlays.get_mut(&overlay) {
            state.visible = visible;
        }
    }
}

/// Fetcher answering every URL with the same payload.
struct StaticFetcher(Bytes);

#[async_trait]
impl SubtitleFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes> {
        Ok(self.0.clone())
    }
}

pub fn static_fetcher(content: &str) -> Box<dyn SubtitleFetcher> {
    Box::new(StaticFetcher(Bytes::from(content.as_bytes().to_vec())))
}

/// Fetcher serving a fixed URL-to-payload map.
pub struct MapFetcher {
    responses: HashMap<String, Bytes>,
}

impl MapFetcher {
    pub fn new(responses: &[(&str, &str)]) -> Box<dyn SubtitleFetcher> {
        Box::new(Self {
            responses: responses
                .iter()
                .map(|(url, body)| (url.to_string(), Bytes::from(body.as_bytes().to_vec())))
                .collect(),
        })
    }
}

#[async_trait]
impl SubtitleFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::Fetch {
                url: url.to_string(),
                reason: "no canned response".to_string(),
            })
    }
}

pub fn test_session() -> Session {
    Session::new(static_fetcher(FR_VTT))
}

pub fn test_settings() -> SmartSubSettings {
    SmartSubSettings {
        target_language: "fr".to_string(),
        native_language: "en".to_string(),
        vocabulary_level: 1000,
        enabled: true,
    }
}

pub enum FusionBehavior {
    /// Answer every job with this SRT document.
    Succeed(String),
    /// Reject every job with this service-side message.
    Reject(String),
    /// Sleep, then answer with this SRT document.
    Delayed(String, Duration),
}

/// Scriptable [`FusionApi`]. `on_call` runs before the reply is produced,
/// which lets a test change the page mid-flight.
pub struct MockFusion {
    behavior: FusionBehavior,
    calls: AtomicUsize,
    on_call: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl MockFusion {
    pub fn new(behavior: FusionBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            on_call: Mutex::new(None),
        }
    }

    pub fn set_on_call(&self, hook: Box<dyn Fn() + Send + Sync>) {
        *self.on_call.lock() = Some(hook);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FusionApi for MockFusion {
    async fn fuse(
        &self,
        _target_srt: &str,
        _native_srt: &str,
        _settings: &SmartSubSettings,
    ) -> std::result::Result<FusionResponse, FusionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = match &self.behavior {
            FusionBehavior::Succeed(srt) => srt.clone(),
            FusionBehavior::Reject(message) => {
                return Err(FusionError::Rejected(message.clone()));
            }
            FusionBehavior::Delayed(srt, delay) => {
                tokio::time::sleep(*delay).await;
                srt.clone()
            }
        };
        if let Some(hook) = self.on_call.lock().as_ref() {
            hook();
        }
        Ok(FusionResponse {
            success: true,
            output_srt: Some(output),
            stats: Some(FusionStats {
                total_subtitles: 2,
                replaced_subtitles: 1,
                replacement_rate: 0.5,
                processing_time: 0.1,
            }),
            error: None,
        })
    }

    async fn health(&self) -> bool {
        true
    }
}

pub struct StaticSettings(pub SmartSubSettings);

#[async_trait]
impl crate::pipeline::SettingsStore for StaticSettings {
    async fn load(&self) -> Result<SmartSubSettings> {
        Ok(self.0.clone())
    }
}

pub struct FailingSettings;

#[async_trait]
impl crate::pipeline::SettingsStore for FailingSettings {
    async fn load(&self) -> Result<SmartSubSettings> {
        Err(EngineError::Settings("storage unavailable".to_string()))
    }
}

/// Fails the first `n` loads, then succeeds.
pub struct FlakySettings {
    settings: SmartSubSettings,
    failures_left: AtomicUsize,
}

impl FlakySettings {
    pub fn new(settings: SmartSubSettings, failures: usize) -> Self {
        Self {
            settings,
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl crate::pipeline::SettingsStore for FlakySettings {
    async fn load(&self) -> Result<SmartSubSettings> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(EngineError::Settings("storage not ready".to_string()));
        }
        Ok(self.settings.clone())
    }
}

/// Fast-retry config for pipeline tests.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        settings_backoff_ms: 1,
        loading_delay_ms: 50,
        ..Default::default()
    }
}
