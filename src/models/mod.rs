// src/models/mod.rs

//! Domain models for the consent engine.
//!
//! This module contains the data structures shared across the engine,
//! organized by their primary purpose.

mod config;
mod provider;
mod session;
mod settings;

// Re-export all public types
pub use config::{Config, ElementSelector, EngineConfig, ThumbnailConfig, WaitPolicy};
pub use provider::{ManagedSource, Provider, SourceId};
pub use session::{
    CancelCallback, GateOptions, GateOutcome, MediaKind, Session, SessionId, SessionOptions,
    SessionSpec, SessionState,
};
pub use settings::{ConsentSettings, GeneralSettings, ModalSettings, ProviderSettings, WidgetSettings};

/// Requested thumbnail dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::new(295, 166)
    }
}
