//! Error types for reference module fetching

use thiserror::Error;

use crate::core::module::ModuleId;

/// Errors a [`ModuleFetcher`](crate::compilation::ModuleFetcher) can report
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Module '{0}' is not available")]
    NotFound(ModuleId),

    #[error("HTTP {status} when fetching {url}")]
    Status { status: u16, url: String },

    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Invalid module request: {0}")]
    InvalidRequest(String),
}
