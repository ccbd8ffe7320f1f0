//! Session-scoped caches
//!
//! Three distinct maps, all bounded only by the session lifetime:
//! - track lists per movie (last-write-wins),
//! - downloaded subtitle payloads per (movie, track),
//! - fused subtitle documents per learner-parameter key.
//!
//! The content cache is the only component allowed to perform the raw
//! subtitle download; everything else goes through `get_or_fetch`.

use crate::error::{EngineError, Result};
use crate::types::{MovieId, SubtitleTrack, TrackId};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

/// Performs the raw subtitle download for the content cache.
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// HTTP fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubtitleFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await.map_err(|e| {
            EngineError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(EngineError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        response.bytes().await.map_err(|e| EngineError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Track metadata per movie.
#[derive(Default)]
pub struct TrackCache {
    entries: DashMap<MovieId, Vec<SubtitleTrack>>,
}

impl TrackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a movie's track list. The platform may resend track metadata;
    /// last write wins.
    pub fn insert(&self, movie_id: MovieId, tracks: Vec<SubtitleTrack>) {
        self.entries.insert(movie_id, tracks);
    }

    pub fn get(&self, movie_id: MovieId) -> Option<Vec<SubtitleTrack>> {
        self.entries.get(&movie_id).map(|e| e.clone())
    }

    pub fn contains(&self, movie_id: MovieId) -> bool {
        self.entries.contains_key(&movie_id)
    }

    pub fn find_track(&self, movie_id: MovieId, track_id: &str) -> Option<SubtitleTrack> {
        self.entries
            .get(&movie_id)
            .and_then(|tracks| tracks.iter().find(|t| t.id == track_id).cloned())
    }

    /// First non-CC track for a language, falling back to any track for it.
    pub fn find_by_language(&self, movie_id: MovieId, language: &str) -> Option<SubtitleTrack> {
        let tracks = self.entries.get(&movie_id)?;
        tracks
            .iter()
            .find(|t| t.language == language && !t.is_closed_captions)
            .or_else(|| tracks.iter().find(|t| t.language == language))
            .cloned()
    }
}

/// Downloaded subtitle payloads, keyed `movieId/trackId`.
pub struct ContentCache {
    entries: DashMap<String, Bytes>,
    fetcher: Box<dyn SubtitleFetcher>,
}

impl ContentCache {
    pub fn new(fetcher: Box<dyn SubtitleFetcher>) -> Self {
        Self {
            entries: DashMap::new(),
            fetcher,
        }
    }

    fn make_key(movie_id: MovieId, track_id: &str) -> String {
        format!("{movie_id}/{track_id}")
    }

    /// Return the cached payload or download it exactly once.
    ///
    /// A failed download writes nothing, so a later retry can succeed.
    pub async fn get_or_fetch(
        &self,
        movie_id: MovieId,
        track_id: &TrackId,
        url: &str,
    ) -> Result<Bytes> {
        let key = Self::make_key(movie_id, track_id);

        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }

        tracing::debug!(%key, url, "fetching subtitle content");
        let data = self.fetcher.fetch(url).await?;
        self.entries.insert(key, data.clone());
        Ok(data)
    }

    pub fn contains(&self, movie_id: MovieId, track_id: &str) -> bool {
        self.entries.contains_key(&Self::make_key(movie_id, track_id))
    }
}

/// Fused subtitle documents, keyed by movie plus learner parameters.
///
/// Distinct from the content cache: the key includes the learner's target
/// language, native language and vocabulary level, not just track identity.
#[derive(Default)]
pub struct ProcessedCache {
    entries: DashMap<String, String>,
}

impl ProcessedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(movie_id: MovieId, target: &str, native: &str, vocabulary_level: u32) -> String {
        format!("{movie_id}-{target}-{native}-{vocabulary_level}")
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn insert(&self, key: String, fused_srt: String) {
        self.entries.insert(key, fused_srt);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop all fused results for one movie (movie-change cleanup).
    pub fn remove_movie(&self, movie_id: MovieId) {
        let prefix = format!("{movie_id}-");
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
