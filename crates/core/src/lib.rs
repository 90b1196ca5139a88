//! Shared data model, configuration and error types for the media-mix engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{MixError, MixResult};
