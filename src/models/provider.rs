// src/models/provider.rs

//! Provider identifiers and recognized sources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An embed provider whose activation is consent-managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Vimeo,
    YouTube,
    Buzzsprout,
    Orbita,
}

impl Provider {
    /// All providers, in recognition order.
    pub const ALL: [Provider; 4] = [
        Provider::YouTube,
        Provider::Vimeo,
        Provider::Buzzsprout,
        Provider::Orbita,
    ];

    /// Stable lowercase name, also used as a modal class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vimeo => "vimeo",
            Provider::YouTube => "youtube",
            Provider::Buzzsprout => "buzzsprout",
            Provider::Orbita => "orbita",
        }
    }

    /// Map a matched domain back to its provider.
    pub fn from_domain(domain: &str) -> Option<Self> {
        match domain {
            "vimeo.com" => Some(Provider::Vimeo),
            "youtube.com" | "youtu.be" | "youtube-nocookie.com" => Some(Provider::YouTube),
            "buzzsprout.com" => Some(Provider::Buzzsprout),
            "orbita.com" | "orbita.cloud" => Some(Provider::Orbita),
            _ => None,
        }
    }

    /// Whether the provider plays video in an iframe player.
    pub fn is_video(&self) -> bool {
        matches!(self, Provider::Vimeo | Provider::YouTube)
    }

    /// Script id and URL of the player SDK, for providers that have one.
    pub fn sdk_script(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Provider::YouTube => Some(("youtube-api", "https://www.youtube.com/iframe_api")),
            Provider::Vimeo => Some(("vimeo-api", "https://player.vimeo.com/api/player.js")),
            Provider::Buzzsprout | Provider::Orbita => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The identifying token extracted from a managed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceId {
    Video(String),
    Subscription(String),
    None,
}

/// A URL recognized as belonging to a managed provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedSource {
    pub provider: Provider,
    pub domain: String,
    pub id: SourceId,
}

impl ManagedSource {
    /// Video id, when the source is a video.
    pub fn video_id(&self) -> Option<&str> {
        match &self.id {
            SourceId::Video(id) => Some(id),
            _ => None,
        }
    }

    /// Podcast subscription id, when the source is a Buzzsprout script.
    pub fn subscription_id(&self) -> Option<&str> {
        match &self.id {
            SourceId::Subscription(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ManagedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            SourceId::Video(id) => write!(f, "{} video {} ({})", self.provider, id, self.domain),
            SourceId::Subscription(id) => {
                write!(f, "{} subscription {} ({})", self.provider, id, self.domain)
            }
            SourceId::None => write!(f, "{} ({})", self.provider, self.domain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_domain() {
        assert_eq!(Provider::from_domain("youtu.be"), Some(Provider::YouTube));
        assert_eq!(
            Provider::from_domain("youtube-nocookie.com"),
            Some(Provider::YouTube)
        );
        assert_eq!(Provider::from_domain("orbita.cloud"), Some(Provider::Orbita));
        assert_eq!(Provider::from_domain("example.com"), None);
    }

    #[test]
    fn test_sdk_script_only_for_players() {
        assert!(Provider::Vimeo.sdk_script().is_some());
        assert!(Provider::YouTube.sdk_script().is_some());
        assert!(Provider::Buzzsprout.sdk_script().is_none());
        assert!(Provider::Orbita.sdk_script().is_none());
    }
}
