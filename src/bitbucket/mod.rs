//! Bitbucket Cloud pull request client.
//!
//! Token retrieval lives in [`auth`], the retrying GET in [`fetch`], and the
//! pull request and diff endpoints in [`pulls`] and [`diff`].

pub mod auth;
pub mod diff;
pub mod fetch;
pub mod pulls;
pub mod types;

#[cfg(test)]
mod test_support;

pub use types::{
    AccessToken, Credentials, DiffResult, Endpoints, PullRequestPage, PullRequestQuery,
    PullRequestResult, PullRequestSummary, QueryParams,
};

use serde::Serialize;
use thiserror::Error;

use crate::http::{HttpResponse, ReqwestTransport, Sleeper, ThreadSleeper, Transport, TransportError};

/// Statuses an API call may finish with. 555 is also a retry target in
/// [`fetch`]; seeing it here means the retries ran out on it.
pub const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 555];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Access token response has no `access_token` field")]
    MissingAccessToken,

    #[error("Access token response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum BitbucketError {
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Page response has no `values` array")]
    MissingValues,

    #[error("Diff is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The diff has content but no `diff --git` header was recognised.
    #[error("Diff is not empty but no files were found in it; the diff format may have changed")]
    UnrecognisedDiffFormat,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Human-readable explanation for the statuses Bitbucket users hit most.
pub fn status_message(status: u16) -> Option<&'static str> {
    match status {
        403 => Some("HTTP 403 Forbidden - Does your bitbucket user have rights to the repo?"),
        404 => Some("HTTP 404 Not Found - Does the repo supplied exist?"),
        400 => Some("HTTP 401 Unauthorized - Are your bitbucket credentials correct?"),
        429 => Some("HTTP 429 Too many requests"),
        _ => None,
    }
}

/// Table message for the response status, or the status and raw body.
pub fn error_message(response: &HttpResponse) -> String {
    match status_message(response.status) {
        Some(message) => message.to_string(),
        None => format!("Response: {}\n{}", response.status, response.text_lossy()),
    }
}

/// Fail unless the status is 200, 201 or 555.
pub fn check_status_code(response: &HttpResponse) -> Result<(), BitbucketError> {
    if ACCEPTED_STATUSES.contains(&response.status) {
        return Ok(());
    }
    Err(BitbucketError::Status {
        status: response.status,
        message: error_message(response),
    })
}

/// Pretty-print JSON with sorted keys and 4-space indentation.
pub fn json_pp<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    // Round-trip through Value so object keys come out sorted.
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    let mut rendered = String::from_utf8_lossy(&out).into_owned();
    rendered.push('\n');
    Ok(rendered)
}

/// Synchronous Bitbucket client. Generic over the transport and the sleeper
/// so retries and page pauses can be observed without a network.
#[derive(Debug)]
pub struct BitbucketClient<T = ReqwestTransport, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    endpoints: Endpoints,
}

impl BitbucketClient {
    pub fn new() -> Self {
        Self::with_parts(ReqwestTransport::new(), ThreadSleeper, Endpoints::default())
    }
}

impl Default for BitbucketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport, S: Sleeper> BitbucketClient<T, S> {
    pub fn with_parts(transport: T, sleeper: S, endpoints: Endpoints) -> Self {
        Self {
            transport,
            sleeper,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}
