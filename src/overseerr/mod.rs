//! Overseerr API client
//!
//! Provides the [`MediaService`] interface used by the bot and its HTTP
//! implementation, [`OverseerrClient`].

mod client;
mod http_utils;
/// Wire and domain types
pub mod types;

pub use client::OverseerrClient;
pub use http_utils::clean_error_body;
pub use types::{
    Availability, CreatedRequest, MediaDetails, MediaEnrichment, MediaType, RequestPayload,
    RottenTomatoesRating, SearchResultItem,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to Overseerr
#[derive(Debug, Error)]
pub enum OverseerrError {
    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(String),
    /// Non-success status returned by the API
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Cleaned response body
        message: String,
    },
    /// Response body could not be parsed
    #[error("JSON error: {0}")]
    Json(String),
    /// Client could not be constructed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Interface to the media-request service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaService: Send + Sync {
    /// Search movies and TV series by title
    async fn search(&self, query: &str) -> Result<Vec<SearchResultItem>, OverseerrError>;

    /// Titles recommended for the given one
    async fn recommendations(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<Vec<SearchResultItem>, OverseerrError>;

    /// Create a download request
    async fn create_request(
        &self,
        media_type: MediaType,
        media_id: u64,
        is_4k: bool,
    ) -> Result<CreatedRequest, OverseerrError>;

    /// Approve a previously created request
    async fn approve_request(&self, request_id: u64, is_4k: bool) -> Result<(), OverseerrError>;

    /// Movie or TV details (external ids, videos)
    async fn details(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<MediaDetails, OverseerrError>;

    /// Rotten Tomatoes ratings, `None` when Overseerr has none
    async fn ratings(
        &self,
        media_type: MediaType,
        media_id: u64,
    ) -> Result<Option<RottenTomatoesRating>, OverseerrError>;
}
