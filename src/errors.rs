//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Error`] covers all failure modes of a stage session:
//! - Network failures (target registration, asset fetches)
//! - Asset decoding errors (FBX, glTF, OBJ/MTL, HDR images)
//! - Tracking and rendering failures reported by host collaborators
//! - Session invariants (a second model attach)
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, Error>`.
//! The application layer decides which failures are merely logged.
//!
//! ```rust,ignore
//! use ar_stage::errors::{Error, Result};
//!
//! async fn fetch() -> Result<Vec<u8>> {
//!     // Operations that may fail return Result
//!     Ok(Vec::new())
//! }
//! ```

use thiserror::Error;

/// Asset-specific failures.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The requested asset was not found.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset bytes do not follow the expected format.
    #[error("Invalid asset format: {0}")]
    Format(String),

    /// The asset parsed but its content is inconsistent.
    #[error("Invalid asset data: {0}")]
    InvalidData(String),

    /// No decoder is registered for this kind of asset.
    #[error("Unsupported asset format: {0}")]
    UnsupportedFormat(String),
}

/// The main error type of the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// Asset loading or decoding error.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// glTF parsing or loading error.
    #[error("glTF error: {0}")]
    Gltf(String),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // HTTP & Network Errors
    // ========================================================================
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status} for {url}")]
    HttpResponse {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// The target registry refused or could not resolve a target.
    #[error("Target registration failed: {0}")]
    TargetRegistration(String),

    /// The AR tracking runtime failed to update.
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// The host renderer failed to draw a frame.
    #[error("Render error: {0}")]
    Render(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A model is already attached to this session.
    #[error("A model is already loaded in this session")]
    ModelAlreadyLoaded,

    /// A scene node handle no longer refers to a live node.
    #[error("Scene node not found")]
    NodeNotFound,

    /// Attaching would create a cycle or attach a node to itself.
    #[error("Invalid scene hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Gltf(err.to_string())
    }
}

impl Error {
    /// Shorthand for an [`AssetError::Format`] error.
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Asset(AssetError::Format(message.into()))
    }

    /// Shorthand for an [`AssetError::InvalidData`] error.
    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Error::Asset(AssetError::InvalidData(message.into()))
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
