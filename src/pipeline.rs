//! Processing pipeline
//!
//! Orchestrates a playback session end to end: load the viewer's
//! settings, fetch and convert the two subtitle tracks, run them through
//! the fusion service, and attach the result. Every failure path falls
//! back to attaching the unmodified original track, so the viewer always
//! has subtitles.

use crate::bridge::{PageBridge, PageEvent};
use crate::config::EngineConfig;
use crate::convert::{srt_to_webvtt, webvtt_to_srt};
use crate::error::{EngineError, FusionError, Result};
use crate::fusion::FusionApi;
use crate::render::Renderer;
use crate::session::Session;
use crate::types::{MovieId, SmartSubSettings, SubtitleTrack};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistent viewer settings, stored outside the page context.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<SmartSubSettings>;
}

/// Placeholder cue shown while a fusion job is in flight. One cue
/// spanning the whole title, replaced when the real track attaches.
fn loading_webvtt() -> String {
    "WEBVTT\n\n00:00:00.000 --> 04:00:00.000\nLoading smart subtitles…\n".to_string()
}

pub struct Pipeline {
    session: Arc<Session>,
    renderer: Arc<Renderer>,
    fusion: Arc<dyn FusionApi>,
    settings: Arc<dyn SettingsStore>,
    bridge: Arc<PageBridge>,
    config: EngineConfig,
}

impl Pipeline {
    pub fn new(
        session: Arc<Session>,
        renderer: Arc<Renderer>,
        fusion: Arc<dyn FusionApi>,
        settings: Arc<dyn SettingsStore>,
        bridge: Arc<PageBridge>,
        config: EngineConfig,
    ) -> Self {
        Self {
            session,
            renderer,
            fusion,
            settings,
            bridge,
            config,
        }
    }

    /// Run the pipeline for one title. Infallible from the caller's point
    /// of view: any error is logged, reported once over the bridge, and
    /// answered with the original-track fallback.
    pub async fn run(&self, movie_id: MovieId) {
        let settings = self.load_settings().await;
        let outcome = match &settings {
            Some(s) if s.enabled => self.process(movie_id, s).await,
            Some(s) => self.attach_original(movie_id, Some(&s.target_language)).await,
            None => Err(EngineError::Settings(
                "settings unavailable after retries".to_string(),
            )),
        };
        self.session.set_processing(false);

        if let Err(e) = outcome {
            tracing::warn!(movie_id, error = %e, "pipeline failed, falling back to original track");
            self.session.set_smart_enabled(false);
            self.bridge
                .publish(PageEvent::SmartSubsError { error: e.to_string() });
            let language = settings.as_ref().map(|s| s.target_language.clone());
            if let Err(e) = self.attach_original(movie_id, language.as_deref()).await {
                // Platform captions stay in place; nothing left to try.
                tracing::error!(movie_id, error = %e, "fallback attach failed");
            }
        }
    }

    /// Settings loads race extension startup, so retry with a linear
    /// backoff before giving up.
    async fn load_settings(&self) -> Option<SmartSubSettings> {
        let retries = self.config.settings_retries;
        for attempt in 0..=retries {
            match self.settings.load().await {
                Ok(settings) => return Some(settings),
                Err(e) if attempt < retries => {
                    tracing::debug!(attempt, error = %e, "settings load failed, retrying");
                    tokio::time::sleep(self.config.settings_backoff() * (attempt + 1)).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "settings load failed");
                }
            }
        }
        None
    }

    async fn process(&self, movie_id: MovieId, settings: &SmartSubSettings) -> Result<()> {
        self.session.set_smart_enabled(true);

        let key = crate::cache::ProcessedCache::key(
            movie_id,
            &settings.target_language,
            &settings.native_language,
            settings.vocabulary_level,
        );
        if let Some(cached) = self.session.processed.get(&key) {
            tracing::info!(movie_id, "reusing processed subtitles");
            let webvtt = srt_to_webvtt(&cached);
            self.renderer
                .attach_if_current(&self.session, movie_id, &webvtt, &settings.target_language)?;
            return Ok(());
        }

        self.session.set_processing(true);
        self.spawn_loading_placeholder(movie_id);

        let target = self.find_track(movie_id, &settings.target_language)?;
        let native = self.find_track(movie_id, &settings.native_language)?;

        let target_vtt = self.fetch_track_text(movie_id, &target).await?;
        let native_vtt = self.fetch_track_text(movie_id, &native).await?;
        let target_srt = webvtt_to_srt(&target_vtt)?;
        let native_srt = webvtt_to_srt(&native_vtt)?;

        let response = self.fusion.fuse(&target_srt, &native_srt, settings).await?;
        let output_srt = response.output_srt.ok_or(FusionError::Decode(
            "fusion response carried no subtitles".to_string(),
        ))?;
        self.session.processed.insert(key, output_srt.clone());
        let webvtt = srt_to_webvtt(&output_srt);

        // Clear the in-flight flag first so the placeholder task cannot
        // attach over the finished track.
        self.session.set_processing(false);
        if self
            .renderer
            .attach_if_current(&self.session, movie_id, &webvtt, &settings.target_language)?
        {
            self.session.select_track(&target.id);
            tracing::info!(movie_id, "smart subtitles attached");
            self.bridge
                .publish(PageEvent::SmartSubsSuccess { stats: response.stats });
        } else {
            tracing::debug!(movie_id, "discarding fusion result for stale title");
        }
        Ok(())
    }

    /// Attach the unmodified platform track, preferring `language` when it
    /// is offered.
    pub async fn attach_original(&self, movie_id: MovieId, language: Option<&str>) -> Result<()> {
        let tracks = self
            .session
            .tracks
            .get(movie_id)
            .ok_or(EngineError::NoMovie)?;
        let track = language
            .and_then(|lang| self.session.tracks.find_by_language(movie_id, lang))
            .or_else(|| tracks.first().cloned())
            .ok_or_else(|| EngineError::TrackNotFound {
                movie_id,
                language: language.unwrap_or("any").to_string(),
            })?;
        let webvtt = self.fetch_track_text(movie_id, &track).await?;
        if self
            .renderer
            .attach_if_current(&self.session, movie_id, &webvtt, &track.language)?
        {
            self.session.select_track(&track.id);
            tracing::info!(movie_id, language = %track.language, "original track attached");
        }
        Ok(())
    }

    /// Produce the SRT export for one track: `(filename, content)`.
    pub async fn export_srt(&self, track_id: &str) -> Result<(String, String)> {
        let movie_id = self.session.current_movie_id().ok_or(EngineError::NoMovie)?;
        let track = self
            .session
            .tracks
            .find_track(movie_id, track_id)
            .ok_or_else(|| EngineError::UnknownTrack(track_id.to_string()))?;
        let webvtt = self.fetch_track_text(movie_id, &track).await?;
        let srt = webvtt_to_srt(&webvtt)?;
        let filename = format!("subtitle_{}_{}.srt", movie_id, track.language);
        Ok((filename, srt))
    }

    /// Handle a download request, reporting the outcome over the bridge.
    pub async fn handle_download(&self, track_id: &str) {
        match self.export_srt(track_id).await {
            Ok((filename, _srt)) => {
                self.bridge.publish(PageEvent::DownloadSuccess { filename });
            }
            Err(e) => {
                tracing::warn!(track_id, error = %e, "subtitle download failed");
                self.bridge
                    .publish(PageEvent::DownloadError { error: e.to_string() });
            }
        }
    }

    fn find_track(&self, movie_id: MovieId, language: &str) -> Result<SubtitleTrack> {
        self.session
            .tracks
            .find_by_language(movie_id, language)
            .ok_or_else(|| EngineError::TrackNotFound {
                movie_id,
                language: language.to_string(),
            })
    }

    async fn fetch_track_text(&self, movie_id: MovieId, track: &SubtitleTrack) -> Result<String> {
        let bytes = self
            .session
            .content
            .get_or_fetch(movie_id, &track.id, &track.url)
            .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Show the loading cue after a short grace period, unless the job
    /// already finished or the viewer moved on.
    fn spawn_loading_placeholder(&self, movie_id: MovieId) {
        let session = self.session.clone();
        let renderer = self.renderer.clone();
        let delay = self.config.loading_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !session.is_processing() || session.current_movie_id() != Some(movie_id) {
                return;
            }
            // The processing re-check runs under the render lock: once the
            // finished track clears the flag and attaches, a late
            // placeholder cannot overwrite it.
            let attach = renderer.attach_when(&session, movie_id, &loading_webvtt(), "", || {
                session.is_processing()
            });
            if let Err(e) = attach {
                tracing::debug!(movie_id, error = %e, "loading placeholder attach failed");
            }
        });
    }
}
