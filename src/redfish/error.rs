//! Redfish error types and HTTP failure classification

use serde_json::Value;
use thiserror::Error;

/// Shown for any 401 response, regardless of body.
pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid login credentials. Check the BMC username and password.";

/// Appended to local failures, where the BMC never answered with a status.
pub const CHECK_ARGUMENTS_HINT: &str = "Please check the arguments or the BMC server status.";

/// Broad failure class. Both are terminal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The BMC answered with a non-success HTTP status.
    Http,
    /// Connection, decode, or shape failure on our side of the wire.
    Local,
}

/// Error type for Redfish operations
#[derive(Debug, Error)]
pub enum RedfishError {
    /// The BMC rejected the credentials or the session token
    #[error("{url} returned HTTP 401: invalid credentials")]
    Unauthorized { url: String },

    /// Non-success status carrying `@Message.ExtendedInfo` resolutions
    #[error("{url} returned HTTP {status}: {}", .resolutions.join("; "))]
    ExtendedInfo {
        url: String,
        status: u16,
        resolutions: Vec<String>,
    },

    /// Non-success status with no usable error payload
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the JSON we expected
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// A resource lacks a link the traversal requires
    #[error("{resource} has no {link} link")]
    MissingLink { resource: String, link: String },

    /// Session creation succeeded but the response lacked token or location
    #[error("invalid session response: {0}")]
    InvalidSession(String),

    /// The BMC address or a resource link could not be turned into a URL
    #[error("invalid URL {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Result type for Redfish operations
pub type Result<T> = std::result::Result<T, RedfishError>;

impl RedfishError {
    /// Classify a non-success response.
    ///
    /// 401 always maps to [`RedfishError::Unauthorized`]. Otherwise a body
    /// with extended-info resolutions wins over the bare status code.
    pub fn from_response(url: impl Into<String>, status: u16, body: &str) -> Self {
        let url = url.into();
        if status == 401 {
            return Self::Unauthorized { url };
        }
        let resolutions = serde_json::from_str::<Value>(body)
            .map(|v| extended_info_resolutions(&v))
            .unwrap_or_default();
        if resolutions.is_empty() {
            Self::Status { url, status }
        } else {
            Self::ExtendedInfo {
                url,
                status,
                resolutions,
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } | Self::ExtendedInfo { .. } | Self::Status { .. } => {
                ErrorKind::Http
            }
            _ => ErrorKind::Local,
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::ExtendedInfo { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Operator-facing diagnostic text.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Unauthorized { .. } => INVALID_CREDENTIALS_MESSAGE.to_string(),
            Self::ExtendedInfo { resolutions, .. } => resolutions.join("\n"),
            Self::Status { url, status } => {
                format!("Request to {url} failed with HTTP status code {status}")
            }
            local => format!("Error: {local}\n{CHECK_ARGUMENTS_HINT}"),
        }
    }
}

/// Collect every `Resolution` string under `error.@Message.ExtendedInfo`.
pub fn extended_info_resolutions(body: &Value) -> Vec<String> {
    body.get("error")
        .and_then(|e| e.get("@Message.ExtendedInfo"))
        .and_then(|info| info.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("Resolution").and_then(|r| r.as_str()))
                .filter(|r| !r.trim().is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
