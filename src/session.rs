//! Session state and movie tracking
//!
//! One `Session` object owns everything scoped to the injected page's
//! lifetime: the current movie slot, the processing and enablement flags,
//! and the three caches. Components receive it by reference instead of
//! reaching for globals, so independent sessions can coexist in tests.

use crate::cache::{ContentCache, ProcessedCache, SubtitleFetcher, TrackCache};
use crate::render::PageDom;
use crate::types::{MovieId, MovieSession, TrackId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared session state for one injected page.
pub struct Session {
    current: Mutex<Option<MovieSession>>,
    processing: AtomicBool,
    smart_enabled: AtomicBool,
    pub tracks: TrackCache,
    pub content: ContentCache,
    pub processed: ProcessedCache,
}

impl Session {
    pub fn new(fetcher: Box<dyn SubtitleFetcher>) -> Self {
        Self {
            current: Mutex::new(None),
            processing: AtomicBool::new(false),
            smart_enabled: AtomicBool::new(false),
            tracks: TrackCache::new(),
            content: ContentCache::new(fetcher),
            processed: ProcessedCache::new(),
        }
    }

    pub fn current_movie_id(&self) -> Option<MovieId> {
        self.current.lock().as_ref().map(|s| s.movie_id)
    }

    pub fn selected_track_id(&self) -> Option<TrackId> {
        self.current
            .lock()
            .as_ref()
            .and_then(|s| s.selected_track_id.clone())
    }

    /// Record the selected track on the current movie, if one is playing.
    pub fn select_track(&self, track_id: &str) {
        if let Some(session) = self.current.lock().as_mut() {
            session.selected_track_id = Some(track_id.to_string());
        }
    }

    /// Register the observed movie id. On change, the session slot is
    /// replaced wholesale: the track selection and the processing flag are
    /// dropped, and fused results for the previous movie are discarded.
    /// Track and content caches for other movies survive intentionally.
    ///
    /// Returns true when the movie changed and reconciliation is required.
    pub fn observe_movie(&self, movie_id: Option<MovieId>) -> bool {
        let mut current = self.current.lock();
        let previous = current.as_ref().map(|s| s.movie_id);
        if previous == movie_id {
            return false;
        }

        if let Some(previous_id) = previous {
            self.processed.remove_movie(previous_id);
        }
        *current = movie_id.map(MovieSession::new);
        self.processing.store(false, Ordering::SeqCst);

        tracing::info!(?previous, current = ?movie_id, "movie changed");
        true
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn set_processing(&self, value: bool) {
        self.processing.store(value, Ordering::SeqCst);
    }

    pub fn is_smart_enabled(&self) -> bool {
        self.smart_enabled.load(Ordering::SeqCst)
    }

    pub fn set_smart_enabled(&self, value: bool) {
        self.smart_enabled.store(value, Ordering::SeqCst);
    }
}

/// Event-driven movie tracker.
///
/// The embedding host calls `refresh` whenever a video element appears or
/// the page mutates; there is no polling loop, so reconciliation cannot be
/// triggered twice for one change.
pub struct Tracker {
    session: Arc<Session>,
    dom: Arc<dyn PageDom>,
}

impl Tracker {
    pub fn new(session: Arc<Session>, dom: Arc<dyn PageDom>) -> Self {
        Self { session, dom }
    }

    /// Re-read the movie id from the page and update the session.
    /// Returns true when a reconciliation pass is needed.
    pub fn refresh(&self) -> bool {
        let movie_id = self.dom.movie_id_attr();
        self.session.observe_movie(movie_id)
    }
}
