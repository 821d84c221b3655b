// src/models/session.rs

//! Activation session types.

use std::fmt;
use std::sync::Arc;

use super::Provider;
use crate::page::ElementId;

/// Callback invoked when the user closes a consent modal.
pub type CancelCallback = Arc<dyn Fn(ElementId) + Send + Sync>;

/// Identifier of one gating attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// State of an activation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Blocked,
    RequestingConsent,
    Consented,
    Canceled,
    Errored,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Consented | SessionState::Canceled | SessionState::Errored
        )
    }

    /// Whether `self -> next` is an allowed transition.
    pub fn can_advance(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (*self, next) {
            (Blocked, Consented | RequestingConsent | Errored) => true,
            (RequestingConsent, Consented | Canceled | Errored) => true,
            _ => false,
        }
    }
}

/// What the session releases once consent is granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// Iframe player hidden behind a thumbnail image
    Iframe {
        iframe: ElementId,
        thumbnail: ElementId,
        overlay_image: Option<ElementId>,
    },
    /// Video block rendered by an external player on release
    VideoBlock {
        container: ElementId,
        url: String,
        overlay_image: Option<ElementId>,
    },
    /// Podcast script whose player renders into a wrapper
    Buzzsprout {
        script: ElementId,
        wrapper: ElementId,
        overlay_image: Option<ElementId>,
    },
    /// Chat widget script behind a widget stub
    Orbita {
        script: ElementId,
        widget: ElementId,
    },
}

/// Caller overrides for an integration's default options.
#[derive(Clone, Default)]
pub struct GateOptions {
    pub show_modal: Option<bool>,
    pub with_close_button: Option<bool>,
    pub with_default_overlay: Option<bool>,
    pub display_error_modal: Option<bool>,
    pub autoplay: Option<bool>,
    pub cancel_callback: Option<CancelCallback>,
}

impl GateOptions {
    pub fn show_modal(mut self, value: bool) -> Self {
        self.show_modal = Some(value);
        self
    }

    pub fn with_close_button(mut self, value: bool) -> Self {
        self.with_close_button = Some(value);
        self
    }

    pub fn with_default_overlay(mut self, value: bool) -> Self {
        self.with_default_overlay = Some(value);
        self
    }

    pub fn display_error_modal(mut self, value: bool) -> Self {
        self.display_error_modal = Some(value);
        self
    }

    pub fn autoplay(mut self, value: bool) -> Self {
        self.autoplay = Some(value);
        self
    }

    pub fn on_cancel(mut self, callback: impl Fn(ElementId) + Send + Sync + 'static) -> Self {
        self.cancel_callback = Some(Arc::new(callback));
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn or(self, defaults: GateOptions) -> Self {
        Self {
            show_modal: self.show_modal.or(defaults.show_modal),
            with_close_button: self.with_close_button.or(defaults.with_close_button),
            with_default_overlay: self.with_default_overlay.or(defaults.with_default_overlay),
            display_error_modal: self.display_error_modal.or(defaults.display_error_modal),
            autoplay: self.autoplay.or(defaults.autoplay),
            cancel_callback: self.cancel_callback.or(defaults.cancel_callback),
        }
    }

    pub fn resolve(self) -> SessionOptions {
        SessionOptions {
            show_modal: self.show_modal.unwrap_or(false),
            with_close_button: self.with_close_button.unwrap_or(true),
            with_default_overlay: self.with_default_overlay.unwrap_or(true),
            display_error_modal: self.display_error_modal.unwrap_or(true),
            autoplay: self.autoplay.unwrap_or(false),
            cancel_callback: self.cancel_callback,
        }
    }
}

impl fmt::Debug for GateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateOptions")
            .field("show_modal", &self.show_modal)
            .field("with_close_button", &self.with_close_button)
            .field("with_default_overlay", &self.with_default_overlay)
            .field("display_error_modal", &self.display_error_modal)
            .field("autoplay", &self.autoplay)
            .field("cancel_callback", &self.cancel_callback.is_some())
            .finish()
    }
}

/// Fully resolved options carried by a session.
#[derive(Clone)]
pub struct SessionOptions {
    pub show_modal: bool,
    pub with_close_button: bool,
    pub with_default_overlay: bool,
    pub display_error_modal: bool,
    pub autoplay: bool,
    pub cancel_callback: Option<CancelCallback>,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("show_modal", &self.show_modal)
            .field("with_close_button", &self.with_close_button)
            .field("with_default_overlay", &self.with_default_overlay)
            .field("display_error_modal", &self.display_error_modal)
            .field("autoplay", &self.autoplay)
            .finish_non_exhaustive()
    }
}

/// Everything needed to start a session from a surrogate activation.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub target: ElementId,
    pub provider: Provider,
    pub media: MediaKind,
    pub options: SessionOptions,
}

/// One gating attempt on one target.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub spec: SessionSpec,
    pub state: SessionState,
}

/// How a gating entry resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Consent was already present or not required; media released
    Consented,
    /// A consent overlay is open and waiting for the user
    AwaitingConsent(SessionId),
    /// The target already has an overlay or a gating attempt in flight
    AlreadyOpen,
    /// Modal content is empty; nothing was shown
    Suppressed,
    /// CMP failure absorbed by an error modal
    ErrorShown,
}
