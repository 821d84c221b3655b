// src/models/settings.rs

//! Per-provider consent settings, keyed as the CMS exports them.

use serde::{Deserialize, Deserializer, Serialize};

use super::Provider;

/// The `privacy_compliant_media_settings` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentSettings {
    /// Settings shared by every provider
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default, deserialize_with = "lenient")]
    pub vimeo: Option<ProviderSettings>,

    #[serde(default, deserialize_with = "lenient")]
    pub youtube: Option<ProviderSettings>,

    #[serde(default, deserialize_with = "lenient")]
    pub buzzsprout_podcasts: Option<ProviderSettings>,

    #[serde(default, deserialize_with = "lenient")]
    pub orbita_live_chat: Option<ProviderSettings>,
}

impl ConsentSettings {
    /// Settings for the given provider, if configured.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderSettings> {
        match provider {
            Provider::Vimeo => self.vimeo.as_ref(),
            Provider::YouTube => self.youtube.as_ref(),
            Provider::Buzzsprout => self.buzzsprout_podcasts.as_ref(),
            Provider::Orbita => self.orbita_live_chat.as_ref(),
        }
    }
}

/// Settings shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// HTML shown in the error modal when the CMP cannot be reached
    #[serde(default = "default_error_cmp_not_found")]
    pub error_cmp_not_found: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            error_cmp_not_found: default_error_cmp_not_found(),
        }
    }
}

fn default_error_cmp_not_found() -> String {
    "<p>Consent preferences could not be loaded. Please try again later.</p>".into()
}

/// Consent settings for a single provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Consent category required to activate the provider
    #[serde(default)]
    pub cat_id: String,

    /// Category that, when missing, switches playback to privacy-enhanced mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_cat_id: Option<String>,

    /// Custom play-button image shown over thumbnails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_image: Option<String>,

    #[serde(default)]
    pub modal: ModalSettings,

    /// Chat widget stub (Orbita only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetSettings>,
}

impl ProviderSettings {
    /// Dependent category id, ignoring empty strings.
    pub fn dependent_category(&self) -> Option<&str> {
        self.dependent_cat_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// Overlay image URL, ignoring empty strings.
    pub fn overlay_image(&self) -> Option<&str> {
        self.overlay_image
            .as_deref()
            .filter(|src| !src.trim().is_empty())
    }
}

/// Consent modal content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModalSettings {
    /// Modal body HTML; empty suppresses the modal entirely
    #[serde(default)]
    pub description: String,

    #[serde(default = "default_consent_label")]
    pub consent_label: String,

    #[serde(default)]
    pub morelink_label: String,

    #[serde(default)]
    pub morelink_url: String,
}

fn default_consent_label() -> String {
    "I agree".into()
}

impl ModalSettings {
    /// The "more info" link, when both label and URL are set.
    pub fn more_link(&self) -> Option<(&str, &str)> {
        if self.morelink_label.is_empty() || self.morelink_url.is_empty() {
            None
        } else {
            Some((&self.morelink_label, &self.morelink_url))
        }
    }
}

/// HTML/CSS for the chat widget stub shown before consent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default)]
    pub html: String,

    #[serde(default)]
    pub css: String,

    /// Id of the element the widget is appended to
    #[serde(default)]
    pub wrapper_id: String,
}

/// Deserialize a provider table, degrading malformed input to `None`.
fn lenient<'de, D>(deserializer: D) -> std::result::Result<Option<ProviderSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    match value.try_into::<ProviderSettings>() {
        Ok(settings) => Ok(Some(settings)),
        Err(e) => {
            log::warn!("Ignoring malformed provider settings: {}", e);
            Ok(None)
        }
    }
}
