use thiserror::Error;

/// Main error type for the smart-subtitles engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("fusion API error: {0}")]
    Fusion(#[from] FusionError),

    #[error("subtitle fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("malformed WebVTT: {0}")]
    Conversion(String),

    #[error("no movie is currently playing")]
    NoMovie,

    #[error("no {language} track available for movie {movie_id}")]
    TrackNotFound { movie_id: u64, language: String },

    #[error("track {0} not in the current track list")]
    UnknownTrack(String),

    #[error("settings unavailable: {0}")]
    Settings(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fusion-service specific errors.
///
/// The 401/400/500 status codes of the fusion API map to distinct
/// variants so the outward error event carries a human-readable reason.
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("invalid request data")]
    InvalidRequest,

    #[error("server error occurred")]
    Server,

    #[error("API request failed: {0}")]
    Status(u16),

    #[error("request timeout - fusion API took too long to respond")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("fusion rejected the request: {0}")]
    Rejected(String),

    #[error("malformed fusion response: {0}")]
    Decode(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, EngineError>;
