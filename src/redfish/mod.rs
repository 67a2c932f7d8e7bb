//! Redfish client plumbing
//!
//! The traversal in [`crate::inventory`] talks to the BMC only through the
//! [`Transport`] trait. [`HttpTransport`] is the `reqwest::blocking`
//! implementation; tests substitute an in-memory one.

pub mod client;
pub mod error;
pub mod session;

pub use client::HttpTransport;
pub use error::{ErrorKind, RedfishError, Result};
pub use session::{AuthMode, Session, SessionGuard};

use serde_json::Value;

/// Service root every traversal starts from.
pub const SERVICE_ROOT: &str = "/redfish/v1/";

/// Session collection used to log in.
pub const SESSIONS_PATH: &str = "/redfish/v1/SessionService/Sessions";

/// Header carrying the session token on every request.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Credentials attached to each resource request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Session token sent as `X-Auth-Token`
    Token(String),
    /// HTTP basic credentials, used when no session is opened
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Blocking access to a BMC's Redfish service.
///
/// Resource fetches are read-only. The session calls are the only requests
/// that change state on the BMC.
pub trait Transport {
    /// GET a resource link and decode its JSON body.
    fn get(&self, link: &str, auth: &Auth) -> Result<Value>;

    /// Log in and return the issued session.
    fn create_session(&self, username: &str, password: &str) -> Result<Session>;

    /// Log out of a session previously returned by `create_session`.
    fn delete_session(&self, session: &Session) -> Result<()>;
}

/// The `@odata.id` of the object stored under `field`, if any.
pub fn link<'a>(resource: &'a Value, field: &str) -> Option<&'a str> {
    resource
        .get(field)
        .and_then(|v| v.get("@odata.id"))
        .and_then(|v| v.as_str())
}

/// Every `Members[*].@odata.id` of a collection, in source order.
///
/// Entries without an `@odata.id` are skipped; a missing `Members` array
/// yields an empty list.
pub fn member_links(collection: &Value) -> Vec<String> {
    collection
        .get("Members")
        .and_then(|m| m.as_array())
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m.get("@odata.id").and_then(|id| id.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
