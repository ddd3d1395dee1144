//! Best-effort forwarding of submissions to the site backend.
//!
//! The backend contract is minimal: it accepts the submission as a JSON
//! document and answers with a success status and a JSON body. Anything else
//! is a [`SyncError`] for the caller to handle; nothing here retries.

use std::future::Future;

use crate::models::SubmissionInput;

pub mod http;

pub use http::HttpSubmissionSink;

/// Decoded JSON body returned by the backend.
pub type ServerResponse = serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request to contact endpoint failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("contact endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("contact endpoint returned an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Destination for submissions leaving the local store.
pub trait SubmissionSink: Send + Sync {
    fn send_to_server(
        &self,
        input: &SubmissionInput,
    ) -> impl Future<Output = Result<ServerResponse, SyncError>> + Send;
}
