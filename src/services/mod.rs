//! Service layer for the consent engine.
//!
//! This module contains the building blocks the activation controller
//! orchestrates:
//! - Source recognition and the provider registry
//! - The consent gateway over the CMP (`ConsentGateway`)
//! - Overlay/modal construction
//! - Thumbnail resolution (`ThumbnailResolver`)
//! - Player SDK readiness and privacy-enhanced URL rewriting

pub mod gateway;
pub mod overlay;
pub mod privacy;
pub mod recognizer;
pub mod registry;
pub mod sdk;
pub mod thumbnails;

pub use gateway::{ConsentChangeHandler, ConsentGateway, ConsentPlatform, InMemoryPlatform};
pub use recognizer::recognize;
pub use registry::ProviderRegistry;
pub use sdk::{PlaybackError, PlayerHost};
pub use thumbnails::{ThumbnailResolver, ThumbnailSource};
