//! Docmark API Library
//!
//! HTTP surface of the watermarking service: handlers, error rendering,
//! application state and setup.

mod api_doc;
pub mod constants;
mod handlers;
mod utils;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
