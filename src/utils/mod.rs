//! Utility functions and helpers.

pub mod html;
pub mod http;
pub mod url;
pub mod waiter;

pub use waiter::await_ready;
