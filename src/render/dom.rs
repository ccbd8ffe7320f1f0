//! Page environment abstraction
//!
//! The engine runs inside a page it does not own. Everything it needs from
//! that environment (blob URLs, the subtitle `<track>` element, the overlay
//! container, selector queries) goes through this trait so the render state
//! machine is testable without a browser.

use crate::types::MovieId;
use bytes::Bytes;

/// Opaque handle to a DOM node created by the engine.
pub type NodeId = u64;

pub trait PageDom: Send + Sync {
    /// Numeric movie-id attribute on the page (`data-videoid`), if present.
    fn movie_id_attr(&self) -> Option<MovieId>;

    /// Whether a video element currently exists.
    fn video_present(&self) -> bool;

    /// Mint a blob URL owning a copy of `content`.
    fn create_blob_url(&self, content: Bytes) -> String;

    /// Release a blob URL. Returns false when it was unknown or already
    /// revoked.
    fn revoke_blob_url(&self, url: &str) -> bool;

    /// Insert a subtitle track element in hidden display mode, bound to a
    /// blob URL, so the platform's native renderer does not also show it.
    fn insert_track(&self, blob_url: &str, language: &str) -> NodeId;

    /// Remove a node previously created by the engine. Unknown nodes are a
    /// no-op.
    fn remove_node(&self, node: NodeId);

    /// First element matching a CSS selector.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;

    /// Elements whose class attribute looks player-related, with their full
    /// class strings. Input for the generic anchor heuristic.
    fn player_like_elements(&self) -> Vec<(NodeId, String)>;

    /// Insert the caption overlay container under an anchor element.
    fn insert_overlay(&self, anchor: NodeId) -> NodeId;

    /// Replace the overlay's children with one element per entry.
    fn set_overlay_cues(&self, overlay: NodeId, cue_html: &[String]);

    /// Show or hide the overlay without removing it.
    fn set_overlay_visible(&self, overlay: NodeId, visible: bool);
}
