// src/page/events.rs

//! Notifications dispatched to the page when gated media activates.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Dispatched after an iframe player is activated.
pub const LOAD_PLAYER: &str = "loadPlayer";

/// Dispatched after a Buzzsprout script is inserted.
pub const LOAD_PLAYER_BP: &str = "loadPlayerBP";

/// Dispatched on a video block container once it may load its player.
pub const LOAD_VIDEO_WITH_CONSENT: &str = "loadVideoWithConsent";

/// Recorded when the engine clicks an element it does not own.
pub const CLICK: &str = "click";

/// A custom notification dispatched on the page.
#[derive(Debug, Clone, Serialize)]
pub struct PageEvent {
    pub name: String,
    /// `id` attribute of the element the event concerns
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    pub dispatched_at: DateTime<Utc>,
}

impl PageEvent {
    pub fn new(name: impl Into<String>, target_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            target_id,
            detail: None,
            dispatched_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}
