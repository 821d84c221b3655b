// src/lib.rs

//! Media Consent Library
//!
//! Gates embedded third-party media (Vimeo and YouTube players, Buzzsprout
//! podcasts, the Orbita chatbot) behind the visitor's consent as recorded
//! by a consent management platform.

pub mod controller;
pub mod error;
pub mod models;
pub mod page;
pub mod services;
pub mod utils;

pub use controller::{ActivationController, Interaction};
