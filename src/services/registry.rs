// src/services/registry.rs

//! Provider registry: read-only access to per-provider settings.

use crate::models::{ConsentSettings, GeneralSettings, ManagedSource, Provider, ProviderSettings};

use super::recognizer;

/// Static table of provider settings, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    settings: ConsentSettings,
}

impl ProviderRegistry {
    pub fn new(settings: ConsentSettings) -> Self {
        Self { settings }
    }

    /// Settings for a provider, if configured.
    pub fn settings(&self, provider: Provider) -> Option<&ProviderSettings> {
        self.settings.provider(provider)
    }

    pub fn general(&self) -> &GeneralSettings {
        &self.settings.general
    }

    /// A provider is enabled when it is configured, switched on, and
    /// names the consent category it needs.
    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.settings(provider)
            .is_some_and(|s| s.enabled && !s.cat_id.trim().is_empty())
    }

    /// Consent category guarding the provider.
    pub fn consent_category(&self, provider: Provider) -> Option<&str> {
        self.settings(provider)
            .map(|s| s.cat_id.as_str())
            .filter(|id| !id.trim().is_empty())
    }

    pub fn dependent_category(&self, provider: Provider) -> Option<&str> {
        self.settings(provider).and_then(|s| s.dependent_category())
    }

    pub fn overlay_image(&self, provider: Provider) -> Option<&str> {
        self.settings(provider).and_then(|s| s.overlay_image())
    }

    /// Recognize a URL as a managed source.
    pub fn recognize(&self, url: &str) -> Option<ManagedSource> {
        recognizer::recognize(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        let settings: ConsentSettings = toml::from_str(
            r#"
            [youtube]
            enabled = true
            cat_id = "C0003"
            overlay_image = "/play.png"

            [vimeo]
            enabled = false
            cat_id = "C0003"

            [buzzsprout_podcasts]
            enabled = true
            cat_id = ""
            "#,
        )
        .unwrap();
        ProviderRegistry::new(settings)
    }

    #[test]
    fn test_is_enabled() {
        let registry = registry();
        assert!(registry.is_enabled(Provider::YouTube));
        assert!(!registry.is_enabled(Provider::Vimeo));
        assert!(!registry.is_enabled(Provider::Buzzsprout));
        assert!(!registry.is_enabled(Provider::Orbita));
    }

    #[test]
    fn test_lookups() {
        let registry = registry();
        assert_eq!(registry.consent_category(Provider::YouTube), Some("C0003"));
        assert_eq!(registry.consent_category(Provider::Buzzsprout), None);
        assert_eq!(registry.overlay_image(Provider::YouTube), Some("/play.png"));
        assert_eq!(registry.dependent_category(Provider::YouTube), None);
    }
}
