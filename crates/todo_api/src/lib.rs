//! Request layer for the todo backend.
//!
//! Exposes one call per todo endpoint and returns `(status, json)` envelopes
//! so an HTTP adapter or CLI can serve them without touching the engine.

pub mod api;

pub use api::{ApiResponse, TodoApi};
