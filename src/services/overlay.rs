// src/services/overlay.rs

//! Overlay and modal construction.
//!
//! Builders here only create elements; attaching them to a target and
//! wiring their controls is left to the activation controller.

use crate::models::{GeneralSettings, Provider, ProviderSettings};
use crate::page::{ElementId, Page};

pub const OVERLAY_CLASS: &str = "mc-consent-overlay";
pub const MODAL_CLASS: &str = "mc-consent-modal";
pub const CLOSE_CLASS: &str = "mc-consent-close";
pub const CONTENT_CLASS: &str = "mc-consent-content";
pub const ERROR_CONTENT_CLASS: &str = "mc-error-content";
pub const CONSENT_BUTTON_CLASS: &str = "mc-consent-button";
pub const MORE_LINK_CLASS: &str = "mc-consent-link";

pub const THUMBNAIL_CLASS: &str = "mc-video-thumbnail";
pub const OVERLAY_IMAGE_CLASS: &str = "mc-img-overlay";
pub const OVERLAY_IMAGE_TRANSPARENT_CLASS: &str = "mc-img-overlay__transparent";
pub const DEFAULT_VIDEO_OVERLAY_CLASS: &str = "with-default-video-overlay";
pub const CUSTOM_VIDEO_OVERLAY_CLASS: &str = "with-custom-video-overlay";
pub const DEFAULT_PODCAST_PLACEHOLDER_CLASS: &str = "with-default-buzzsprout-placeholder";
pub const CUSTOM_PODCAST_PLACEHOLDER_CLASS: &str = "with-custom-buzzsprout-placeholder";

/// Elements making up one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayParts {
    pub overlay: ElementId,
    pub modal: Option<ElementId>,
    /// The "I agree" control; absent on error modals
    pub agree: Option<ElementId>,
    pub close: Option<ElementId>,
}

/// Build a consent overlay for `provider`.
///
/// An empty modal description yields a bare overlay with no modal.
pub fn build_consent_overlay(
    page: &Page,
    provider: Provider,
    settings: &ProviderSettings,
    with_close_button: bool,
) -> OverlayParts {
    let overlay = page.create_element("div");
    page.add_class(overlay, OVERLAY_CLASS);

    if settings.modal.description.is_empty() {
        return OverlayParts {
            overlay,
            modal: None,
            agree: None,
            close: None,
        };
    }

    let (modal, title, content) = dialog_shell(page, "Consent request");
    page.add_class(modal, provider.as_str());
    page.add_class(content, CONTENT_CLASS);
    page.set_inner_html(content, settings.modal.description.clone());

    let close = with_close_button.then(|| close_button(page));

    let agree = page.create_element("button");
    page.add_class(agree, CONSENT_BUTTON_CLASS);
    page.set_inner_html(agree, settings.modal.consent_label.clone());

    let more_link = settings.modal.more_link().map(|(label, url)| {
        let link = page.create_element("a");
        page.add_class(link, MORE_LINK_CLASS);
        page.set_attr(link, "href", url);
        page.set_attr(link, "role", "button");
        page.set_attr(link, "aria-label", label);
        page.set_inner_html(link, label);
        link
    });

    if let Some(close) = close {
        page.append_child(modal, close);
    }
    page.append_child(modal, title);
    page.append_child(modal, content);
    page.append_child(modal, agree);
    if let Some(link) = more_link {
        page.append_child(modal, link);
    }
    page.append_child(overlay, modal);
    page.observe_width(modal);

    OverlayParts {
        overlay,
        modal: Some(modal),
        agree: Some(agree),
        close,
    }
}

/// Build the close-only overlay shown when the CMP cannot be reached.
pub fn build_error_overlay(
    page: &Page,
    general: &GeneralSettings,
    with_close_button: bool,
) -> OverlayParts {
    let overlay = page.create_element("div");
    page.add_class(overlay, OVERLAY_CLASS);

    let (modal, title, content) = dialog_shell(page, "Error message");
    page.add_class(content, ERROR_CONTENT_CLASS);
    page.set_inner_html(content, general.error_cmp_not_found.clone());

    let close = with_close_button.then(|| close_button(page));
    if let Some(close) = close {
        page.append_child(modal, close);
    }
    page.append_child(modal, title);
    page.append_child(modal, content);
    page.append_child(overlay, modal);
    page.observe_width(modal);

    OverlayParts {
        overlay,
        modal: Some(modal),
        agree: None,
        close,
    }
}

/// Dialog element with its hidden title and an empty description element.
fn dialog_shell(page: &Page, title_text: &str) -> (ElementId, ElementId, ElementId) {
    let title_id = page.generate_id("mc-dialog-title-");
    let desc_id = page.generate_id("mc-dialog-desc-");

    let modal = page.create_element("div");
    page.set_attr(modal, "role", "dialog");
    page.set_attr(modal, "aria-labelledby", title_id.clone());
    page.set_attr(modal, "aria-describedby", desc_id.clone());
    page.add_class(modal, MODAL_CLASS);

    // Visually hidden; present for assistive technology.
    let title = page.create_element("h2");
    page.set_attr(title, "id", title_id);
    page.set_attr(title, "hidden", "hidden");
    page.set_attr(title, "aria-hidden", "true");
    page.set_inner_html(title, title_text);

    let content = page.create_element("div");
    page.set_attr(content, "id", desc_id);

    (modal, title, content)
}

fn close_button(page: &Page) -> ElementId {
    let close = page.create_element("div");
    page.add_class(close, CLOSE_CLASS);
    page.set_inner_html(close, "&#10005;");
    page.set_attr(close, "role", "button");
    page.set_attr(close, "aria-label", "Close");
    page.set_attr(close, "tabindex", "0");
    close
}
