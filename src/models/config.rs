//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConsentSettings, Provider};
use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Timing and page-structure settings for the activation engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Thumbnail lookup settings
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    /// Per-provider consent settings
    #[serde(default, rename = "privacy_compliant_media_settings")]
    pub consent: ConsentSettings,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.engine.wait.interval_ms == 0 {
            return Err(AppError::validation("engine.wait.interval_ms must be > 0"));
        }
        if self.engine.wait.max_attempts == 0 {
            return Err(AppError::validation("engine.wait.max_attempts must be > 0"));
        }
        if self.thumbnails.timeout_secs == 0 {
            return Err(AppError::validation("thumbnails.timeout_secs must be > 0"));
        }
        if self.thumbnails.user_agent.trim().is_empty() {
            return Err(AppError::validation("thumbnails.user_agent is empty"));
        }

        for provider in Provider::ALL {
            let Some(settings) = self.consent.provider(provider) else {
                continue;
            };
            if settings.enabled && settings.cat_id.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "{provider} is enabled but has no cat_id"
                )));
            }
            if provider == Provider::Orbita && settings.enabled {
                match &settings.widget {
                    Some(widget) if !widget.wrapper_id.is_empty() => {}
                    _ => {
                        return Err(AppError::validation(
                            "orbita_live_chat is enabled but widget.wrapper_id is missing",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Activation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Readiness polling policy shared by every wait
    #[serde(default)]
    pub wait: WaitPolicy,

    /// Rendered width above which modals get the `wide` class
    #[serde(default = "defaults::breakpoint_px")]
    pub breakpoint_px: u32,

    /// How to find the chat button injected by the chatbot script
    #[serde(default)]
    pub chat_button: ElementSelector,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait: WaitPolicy::default(),
            breakpoint_px: defaults::breakpoint_px(),
            chat_button: ElementSelector::default(),
        }
    }
}

/// Polling policy for readiness waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    /// Delay between probes in milliseconds
    #[serde(default = "defaults::interval_ms")]
    pub interval_ms: u64,

    /// Number of delayed probes after the immediate one
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub fn new(interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            interval_ms,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound on how long a wait can take.
    pub fn ceiling(&self) -> Duration {
        self.interval() * self.max_attempts
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval_ms: defaults::interval_ms(),
            max_attempts: defaults::max_attempts(),
        }
    }
}

/// Tag + attribute match used to locate third-party elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementSelector {
    pub tag: String,
    pub attribute: String,
    pub value: String,
}

impl Default for ElementSelector {
    fn default() -> Self {
        Self {
            tag: "button".into(),
            attribute: "aria-label".into(),
            value: "Show Chatbot".into(),
        }
    }
}

/// Thumbnail lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// User-Agent header for oEmbed requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Vimeo oEmbed endpoint
    #[serde(default = "defaults::oembed_endpoint")]
    pub oembed_endpoint: String,

    /// Size used when the target has no rendered size
    #[serde(default = "defaults::width")]
    pub default_width: u32,

    #[serde(default = "defaults::height")]
    pub default_height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            oembed_endpoint: defaults::oembed_endpoint(),
            default_width: defaults::width(),
            default_height: defaults::height(),
        }
    }
}

mod defaults {
    // Engine defaults
    pub fn breakpoint_px() -> u32 {
        600
    }
    pub fn interval_ms() -> u64 {
        100
    }
    pub fn max_attempts() -> u32 {
        50
    }

    // Thumbnail defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; media-consent/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn oembed_endpoint() -> String {
        "https://vimeo.com/api/oembed.json".into()
    }
    pub fn width() -> u32 {
        295
    }
    pub fn height() -> u32 {
        166
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.wait, WaitPolicy::new(100, 50));
        assert_eq!(config.engine.wait.ceiling(), Duration::from_secs(5));
        assert_eq!(config.engine.breakpoint_px, 600);
        assert_eq!(config.thumbnails.default_width, 295);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [engine.wait]
            max_attempts = 10

            [privacy_compliant_media_settings.vimeo]
            enabled = true
            cat_id = "C0003"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.wait.interval_ms, 100);
        assert_eq!(config.engine.wait.max_attempts, 10);
        assert!(config.consent.provider(Provider::Vimeo).unwrap().enabled);
    }

    #[test]
    fn test_validate_rejects_enabled_without_category() {
        let config: Config = toml::from_str(
            r#"
            [privacy_compliant_media_settings.youtube]
            enabled = true
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_orbita_wrapper() {
        let config: Config = toml::from_str(
            r#"
            [privacy_compliant_media_settings.orbita_live_chat]
            enabled = true
            cat_id = "C0004"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [thumbnails]
            timeout_secs = 3

            [privacy_compliant_media_settings.buzzsprout_podcasts]
            enabled = true
            cat_id = "C0005"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.thumbnails.timeout_secs, 3);
        assert_eq!(
            config.consent.provider(Provider::Buzzsprout).unwrap().cat_id,
            "C0005"
        );
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load(&missing).is_err());

        let config = Config::load_or_default(&missing);
        assert_eq!(config.engine.wait, WaitPolicy::default());
        assert!(config.consent.provider(Provider::Vimeo).is_none());
    }

    #[test]
    fn test_malformed_provider_table_is_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [privacy_compliant_media_settings.vimeo]
            enabled = "yes"
            cat_id = 4

            [privacy_compliant_media_settings.youtube]
            enabled = true
            cat_id = "C0004"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.consent.provider(Provider::Vimeo).is_none());
        assert!(config.consent.provider(Provider::YouTube).is_some());
        assert!(config.validate().is_ok());
    }
}
