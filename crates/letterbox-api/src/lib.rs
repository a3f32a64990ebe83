//! Letterbox API Library
//!
//! HTTP handlers, application state and setup for the letter upload service.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
