//! Inventory access error types.

use thiserror::Error;

use homing_core::DropReason;

/// Failures of the transport underneath [`crate::InventoryClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("request to {path} timed out")]
    Timeout { path: String },

    #[error("request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("response body from {path} is not JSON: {reason}")]
    Decode { path: String, reason: String },
}

/// Why a single inventory fetch did not produce a usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no response: {0}")]
    NoResponse(#[from] ClientError),

    #[error("inventory returned HTTP {status} for {path}")]
    Rejected { path: String, status: u16 },

    #[error("related link {link} does not contain the API version")]
    BadLink { link: String },
}

impl FetchError {
    /// Map to the drop reason recorded against the candidate being built.
    pub fn to_drop_reason(&self, context: &str) -> DropReason {
        match self {
            FetchError::NoResponse(_) => DropReason::NoResponse {
                context: context.to_string(),
            },
            FetchError::Rejected { status, .. } => DropReason::RemoteRejected {
                context: context.to_string(),
                status: *status,
            },
            FetchError::BadLink { link } => DropReason::IncompleteBody {
                context: format!("{context}: unversioned link {link}"),
            },
        }
    }
}

/// Errors from a region cache refresh.
///
/// A failed refresh leaves the previous snapshot in place.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("region list fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("inventory returned no regions")]
    NoRegions,

    #[error("none of the {fetched} regions returned were usable")]
    NoUsableRegions { fetched: usize },
}
