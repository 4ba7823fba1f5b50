//! Error types shared by the external HTTP clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`ClientError`] failures.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures that can occur while talking to the spreadsheet or the social platform.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build {service} client")]
    ClientBuilder {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// A configured base URL cannot be used to build request URLs.
    #[error("invalid {service} URL `{url}`: {reason}")]
    InvalidUrl {
        service: &'static str,
        url: String,
        reason: String,
    },
    /// A setting the operation depends on is absent.
    #[error("{service} is not configured: missing {setting}")]
    MissingSetting {
        service: &'static str,
        setting: &'static str,
    },
    /// A request could not be sent.
    #[error("failed to send {service} request to `{path}`")]
    RequestSend {
        service: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The remote API answered with an unexpected status code.
    #[error("unexpected {service} response status {status} for `{path}`")]
    RequestStatus {
        service: &'static str,
        path: String,
        status: StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode {service} response for `{path}`")]
    DecodeResponse {
        service: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
}
