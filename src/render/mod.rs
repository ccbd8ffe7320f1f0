//! Subtitle injection and reconciliation
//!
//! Owns the single active render triple (track element, overlay element,
//! blob URL). A new triple is never created without tearing down the
//! previous one first, so blob URLs cannot leak and overlays cannot
//! duplicate.

pub mod dom;

pub use dom::{NodeId, PageDom};

use crate::convert::{parse_webvtt, simplify_text, Cue};
use crate::error::Result;
use crate::session::Session;
use crate::types::MovieId;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Player-surface candidates tried in order for the overlay anchor.
const ANCHOR_SELECTORS: [&str; 6] = [
    ".watch-video",
    "[data-uia=\"video-player\"]",
    ".VideoPlayer",
    ".player-container",
    "[data-testid=\"video-player\"]",
    ".netflix-player",
];

/// Class-name fragments that mark promotional surfaces, never the player.
const EXCLUDED_CLASS_FRAGMENTS: [&str; 3] = ["billboard", "trailer", "preview"];

/// The active render triple plus the cue list driving the overlay.
struct ActiveRender {
    movie_id: MovieId,
    track_node: NodeId,
    overlay_node: Option<NodeId>,
    blob_url: String,
    cues: Vec<Cue>,
}

/// Injection and reconciliation engine. One instance per page session.
pub struct Renderer {
    dom: Arc<dyn PageDom>,
    state: Mutex<Option<ActiveRender>>,
    visible: AtomicBool,
}

impl Renderer {
    pub fn new(dom: Arc<dyn PageDom>) -> Self {
        Self {
            dom,
            state: Mutex::new(None),
            visible: AtomicBool::new(true),
        }
    }

    /// Attach subtitle content for a movie, replacing whatever was attached.
    ///
    /// Always tears down first, even when the replacement is logically the
    /// same content. An overlay anchor miss is non-fatal: the track still
    /// attaches headless and only the custom captions are lost.
    pub fn attach(&self, movie_id: MovieId, webvtt: &str, language: &str) -> Result<()> {
        let cues = parse_webvtt(webvtt)?;
        let mut state = self.state.lock();
        self.attach_locked(&mut state, movie_id, webvtt, language, cues);
        Ok(())
    }

    fn attach_locked(
        &self,
        state: &mut Option<ActiveRender>,
        movie_id: MovieId,
        webvtt: &str,
        language: &str,
        cues: Vec<Cue>,
    ) {
        Self::teardown_inner(&*self.dom, state);

        let blob_url = self
            .dom
            .create_blob_url(Bytes::from(webvtt.as_bytes().to_vec()));
        let track_node = self.dom.insert_track(&blob_url, language);

        let overlay_node = match self.find_anchor() {
            Some(anchor) => {
                let overlay = self.dom.insert_overlay(anchor);
                self.dom
                    .set_overlay_visible(overlay, self.visible.load(Ordering::Relaxed));
                Some(overlay)
            }
            None => {
                tracing::warn!(movie_id, "no player anchor found, attaching track headless");
                None
            }
        };

        tracing::debug!(movie_id, language, cues = cues.len(), "subtitle track attached");
        *state = Some(ActiveRender {
            movie_id,
            track_node,
            overlay_node,
            blob_url,
            cues,
        });
    }

    /// Attach only if `movie_id` is still the session's current movie.
    ///
    /// This is the stale-response check: results computed for a movie the
    /// user has navigated away from must never reach the DOM. Returns
    /// whether the attach happened.
    pub fn attach_if_current(
        &self,
        session: &Session,
        movie_id: MovieId,
        webvtt: &str,
        language: &str,
    ) -> Result<bool> {
        self.attach_when(session, movie_id, webvtt, language, || true)
    }

    /// Like [`Self::attach_if_current`], but additionally requires `guard`
    /// to hold once the render lock is held. A caller racing another
    /// attach (the loading placeholder racing the finished track) can make
    /// its precondition check atomic with the attach itself.
    pub fn attach_when<F>(
        &self,
        session: &Session,
        movie_id: MovieId,
        webvtt: &str,
        language: &str,
        guard: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> bool,
    {
        let cues = parse_webvtt(webvtt)?;
        let mut state = self.state.lock();
        if session.current_movie_id() != Some(movie_id) {
            tracing::debug!(movie_id, "discarding stale render for replaced movie");
            return Ok(false);
        }
        if !guard() {
            return Ok(false);
        }
        self.attach_locked(&mut state, movie_id, webvtt, language, cues);
        Ok(true)
    }

    /// Tear down the active triple. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        Self::teardown_inner(&*self.dom, &mut state);
    }

    fn teardown_inner(dom: &dyn PageDom, state: &mut Option<ActiveRender>) {
        if let Some(active) = state.take() {
            dom.revoke_blob_url(&active.blob_url);
            dom.remove_node(active.track_node);
            if let Some(overlay) = active.overlay_node {
                dom.remove_node(overlay);
            }
        }
    }

    /// The cue-change reaction: clear the overlay and re-render one element
    /// per cue active at `position_secs`, text passed through the same tag
    /// allow-list as the converter.
    pub fn render_at(&self, position_secs: f64) {
        let state = self.state.lock();
        let Some(active) = state.as_ref() else {
            return;
        };
        let Some(overlay) = active.overlay_node else {
            return;
        };

        let cue_html: Vec<String> = active
            .cues
            .iter()
            .filter(|cue| cue.active_at(position_secs))
            .map(|cue| simplify_text(&cue.text))
            .collect();
        self.dom.set_overlay_cues(overlay, &cue_html);
    }

    /// Tear down when the page no longer has a video or a current movie.
    pub fn reconcile(&self, session: &Session) {
        if !self.dom.video_present() || session.current_movie_id().is_none() {
            self.teardown();
        }
    }

    /// Toggle overlay visibility without touching the track element.
    pub fn toggle_visibility(&self) -> bool {
        let visible = !self.visible.load(Ordering::Relaxed);
        self.visible.store(visible, Ordering::Relaxed);
        let state = self.state.lock();
        if let Some(overlay) = state.as_ref().and_then(|a| a.overlay_node) {
            self.dom.set_overlay_visible(overlay, visible);
        }
        visible
    }

    /// Movie id of the attached content, if anything is attached.
    pub fn attached_movie(&self) -> Option<MovieId> {
        self.state.lock().as_ref().map(|a| a.movie_id)
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Ordered selector probe, then the generic heuristic that skips
    /// promotional surfaces.
    fn find_anchor(&self) -> Option<NodeId> {
        for selector in ANCHOR_SELECTORS {
            if let Some(node) = self.dom.query_selector(selector) {
                return Some(node);
            }
        }

        for (node, class) in self.dom.player_like_elements() {
            let class = class.to_lowercase();
            if !EXCLUDED_CLASS_FRAGMENTS
                .iter()
                .any(|fragment| class.contains(fragment))
            {
                return Some(node);
            }
        }
        None
    }
}
