//! Blocking HTTP transport for Redfish
//!
//! One `reqwest::blocking::Client` per run. Requests are sequential and
//! use the client's default timeouts.

use std::path::Path;

use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::LOCATION;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{Auth, RedfishError, Result, Session, Transport, AUTH_TOKEN_HEADER, SESSIONS_PATH};
use crate::security::logging::sanitize_log_message;

/// Redfish transport over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for the BMC at `host`.
    ///
    /// `host` is an address with an optional port (`10.0.0.5`,
    /// `bmc.lab:8443`, `[fd00::5]`). A value that already carries a scheme
    /// is used as the base URL unchanged.
    ///
    /// Without a CA file, certificate verification is disabled: BMCs
    /// ship with self-signed certificates. With one, only that bundle and
    /// the built-in roots are trusted.
    pub fn new(host: &str, cafile: Option<&Path>) -> Result<Self> {
        let base_url = base_url_for(host)?;

        let builder = reqwest::blocking::Client::builder();
        let builder = match cafile {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    RedfishError::Client(format!("cannot read CA file {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    RedfishError::Client(format!("invalid CA file {}: {e}", path.display()))
                })?;
                builder.add_root_certificate(cert)
            }
            None => builder.danger_accept_invalid_certs(true),
        };
        let client = builder
            .build()
            .map_err(|e| RedfishError::Client(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Returns the base URL every link is resolved against.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Resolve a resource link against the BMC's base URL.
    pub fn resolve(&self, link: &str) -> Result<Url> {
        self.base_url
            .join(link)
            .map_err(|e| RedfishError::InvalidUrl(format!("\"{link}\": {e}")))
    }

    fn send(&self, url: &Url, request: RequestBuilder) -> Result<Response> {
        request.send().map_err(|source| RedfishError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, link: &str, auth: &Auth) -> Result<Value> {
        let url = self.resolve(link)?;
        debug!(url = %url, "GET");
        let response = self.send(&url, with_auth(self.client.get(url.clone()), auth))?;
        read_json(&url, response)
    }

    fn create_session(&self, username: &str, password: &str) -> Result<Session> {
        let url = self.resolve(SESSIONS_PATH)?;
        debug!(url = %url, username, "Creating session");
        let request = self
            .client
            .post(url.clone())
            .json(&json!({ "UserName": username, "Password": password }));
        let response = self.send(&url, request)?;

        let status = response.status();
        let token = header_value(&response, AUTH_TOKEN_HEADER);
        let location = header_value(&response, LOCATION.as_str());
        let body = response.text().map_err(|source| RedfishError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %sanitize_log_message(&body), "Login rejected");
            return Err(RedfishError::from_response(url.as_str(), status.as_u16(), &body));
        }

        let token = token.ok_or_else(|| {
            RedfishError::InvalidSession(format!("{url} returned no {AUTH_TOKEN_HEADER} header"))
        })?;
        let location = location
            .or_else(|| {
                serde_json::from_str::<Value>(&body).ok().and_then(|b| {
                    b.get("@odata.id")
                        .and_then(|id| id.as_str())
                        .map(String::from)
                })
            })
            .ok_or_else(|| {
                RedfishError::InvalidSession(format!("{url} returned no session location"))
            })?;

        Ok(Session::new(token, location))
    }

    fn delete_session(&self, session: &Session) -> Result<()> {
        let url = self.resolve(&session.location)?;
        debug!(url = %url, "Deleting session");
        let request = self
            .client
            .delete(url.clone())
            .header(AUTH_TOKEN_HEADER, &session.token);
        let response = self.send(&url, request)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(RedfishError::from_response(url.as_str(), status.as_u16(), &body))
    }
}

/// Derive the base URL from a host string.
fn base_url_for(host: &str) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(RedfishError::InvalidUrl("empty BMC address".to_string()));
    }
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    let url = Url::parse(&raw).map_err(|e| RedfishError::InvalidUrl(format!("\"{raw}\": {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RedfishError::InvalidUrl(format!(
            "\"{raw}\": scheme must be http or https, got \"{other}\""
        ))),
    }
}

fn with_auth(request: RequestBuilder, auth: &Auth) -> RequestBuilder {
    match auth {
        Auth::Token(token) => request.header(AUTH_TOKEN_HEADER, token),
        Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn read_json(url: &Url, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().map_err(|source| RedfishError::Transport {
        url: url.to_string(),
        source,
    })?;

    if !status.is_success() {
        debug!(
            url = %url,
            status = status.as_u16(),
            body = %sanitize_log_message(&body),
            "Request failed"
        );
        return Err(RedfishError::from_response(url.as_str(), status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| RedfishError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_base_url_from_bare_address() {
        let url = base_url_for("10.0.0.5").unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.5/");
    }

    #[test]
    fn test_base_url_keeps_port_and_ipv6() {
        assert_eq!(
            base_url_for("bmc.lab:8443").unwrap().as_str(),
            "https://bmc.lab:8443/"
        );
        assert_eq!(
            base_url_for("[fd00::5]").unwrap().as_str(),
            "https://[fd00::5]/"
        );
    }

    #[test]
    fn test_base_url_with_explicit_scheme() {
        assert_eq!(
            base_url_for("http://127.0.0.1:8000/").unwrap().as_str(),
            "http://127.0.0.1:8000/"
        );
    }

    #[test]
    fn test_base_url_rejects_bad_input() {
        assert!(base_url_for("").is_err());
        assert!(base_url_for("   ").is_err());
        assert!(base_url_for("ftp://bmc").is_err());
    }

    #[test]
    fn test_resolve_prefixes_host() {
        let transport = HttpTransport::new("10.0.0.5", None).unwrap();
        assert_eq!(transport.base_url(), "https://10.0.0.5/");
        assert_eq!(
            transport.resolve("/redfish/v1/Managers/1").unwrap().as_str(),
            "https://10.0.0.5/redfish/v1/Managers/1"
        );
    }

    #[test]
    fn test_resolve_absolute_link_unchanged() {
        let transport = HttpTransport::new("10.0.0.5", None).unwrap();
        assert_eq!(
            transport
                .resolve("https://10.0.0.5/redfish/v1/SessionService/Sessions/3")
                .unwrap()
                .as_str(),
            "https://10.0.0.5/redfish/v1/SessionService/Sessions/3"
        );
    }

    #[test]
    fn test_missing_cafile_is_client_error() {
        let err = HttpTransport::new("10.0.0.5", Some(Path::new("/nonexistent/ca.pem")))
            .err()
            .unwrap();
        assert!(matches!(err, RedfishError::Client(_)));
        assert!(err.to_string().contains("/nonexistent/ca.pem"));
    }

    #[test]
    fn test_unreachable_host_is_transport_error() {
        // Port 9 on loopback refuses connections.
        let transport = HttpTransport::new("http://127.0.0.1:9", None).unwrap();
        let err = transport
            .get("/redfish/v1/", &Auth::Token("t".to_string()))
            .unwrap_err();
        assert!(matches!(err, RedfishError::Transport { .. }));
        assert_eq!(err.kind(), crate::redfish::ErrorKind::Local);
    }

    fn transport_for(server: &Server) -> HttpTransport {
        HttpTransport::new(&server.url(), None).unwrap()
    }

    #[test]
    fn test_create_session_reads_token_and_location_headers() {
        let mut server = Server::new();
        let login = server
            .mock("POST", SESSIONS_PATH)
            .match_body(Matcher::Json(
                json!({"UserName": "USERID", "Password": "PASSW0RD"}),
            ))
            .with_status(201)
            .with_header("x-auth-token", "tok-123")
            .with_header("location", "/redfish/v1/SessionService/Sessions/7")
            .with_body(r#"{"@odata.id": "/redfish/v1/SessionService/Sessions/other"}"#)
            .create();

        let session = transport_for(&server)
            .create_session("USERID", "PASSW0RD")
            .unwrap();

        login.assert();
        assert_eq!(session.token, "tok-123");
        assert_eq!(session.location, "/redfish/v1/SessionService/Sessions/7");
    }

    #[test]
    fn test_create_session_falls_back_to_body_location() {
        let mut server = Server::new();
        let _login = server
            .mock("POST", SESSIONS_PATH)
            .with_status(201)
            .with_header("x-auth-token", "tok-123")
            .with_body(r#"{"@odata.id": "/redfish/v1/SessionService/Sessions/9"}"#)
            .create();

        let session = transport_for(&server)
            .create_session("USERID", "PASSW0RD")
            .unwrap();
        assert_eq!(session.location, "/redfish/v1/SessionService/Sessions/9");
    }

    #[test]
    fn test_create_session_without_token_is_invalid() {
        let mut server = Server::new();
        let _login = server
            .mock("POST", SESSIONS_PATH)
            .with_status(201)
            .with_header("location", "/redfish/v1/SessionService/Sessions/7")
            .with_body("{}")
            .create();

        let err = transport_for(&server)
            .create_session("USERID", "PASSW0RD")
            .unwrap_err();
        assert!(matches!(err, RedfishError::InvalidSession(_)));
        assert_eq!(err.kind(), crate::redfish::ErrorKind::Local);
    }

    #[test]
    fn test_create_session_rejected_credentials() {
        let mut server = Server::new();
        let _login = server
            .mock("POST", SESSIONS_PATH)
            .with_status(401)
            .with_body(r#"{"error": {"code": "Base.1.0.GeneralError"}}"#)
            .create();

        let err = transport_for(&server)
            .create_session("USERID", "wrong")
            .unwrap_err();
        assert!(matches!(err, RedfishError::Unauthorized { .. }));
    }

    #[test]
    fn test_get_sends_session_token() {
        let mut server = Server::new();
        let root = server
            .mock("GET", "/redfish/v1/")
            .match_header("x-auth-token", "tok-123")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Managers": {"@odata.id": "/redfish/v1/Managers"}}"#)
            .create();

        let body = transport_for(&server)
            .get("/redfish/v1/", &Auth::Token("tok-123".to_string()))
            .unwrap();

        root.assert();
        assert_eq!(body["Managers"]["@odata.id"], "/redfish/v1/Managers");
    }

    #[test]
    fn test_get_sends_basic_credentials() {
        let mut server = Server::new();
        let root = server
            .mock("GET", "/redfish/v1/")
            .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
            .match_header("x-auth-token", Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create();

        let auth = Auth::Basic {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        transport_for(&server).get("/redfish/v1/", &auth).unwrap();
        root.assert();
    }

    #[test]
    fn test_get_error_statuses_are_classified() {
        let mut server = Server::new();
        let _expired = server
            .mock("GET", "/redfish/v1/Managers")
            .with_status(401)
            .create();
        let _failing = server
            .mock("GET", "/redfish/v1/Systems")
            .with_status(500)
            .with_body(
                r#"{"error": {"@Message.ExtendedInfo": [{"Resolution": "Reset the BMC."}]}}"#,
            )
            .create();
        let _missing = server
            .mock("GET", "/redfish/v1/Chassis")
            .with_status(404)
            .with_body("not found")
            .create();

        let transport = transport_for(&server);
        let auth = Auth::Token("tok-123".to_string());

        let err = transport.get("/redfish/v1/Managers", &auth).unwrap_err();
        assert!(matches!(err, RedfishError::Unauthorized { .. }));

        let err = transport.get("/redfish/v1/Systems", &auth).unwrap_err();
        match err {
            RedfishError::ExtendedInfo {
                status,
                resolutions,
                ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(resolutions, vec!["Reset the BMC.".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = transport.get("/redfish/v1/Chassis", &auth).unwrap_err();
        assert!(matches!(err, RedfishError::Status { status: 404, .. }));
    }

    #[test]
    fn test_get_malformed_body_is_decode_error() {
        let mut server = Server::new();
        let _root = server
            .mock("GET", "/redfish/v1/")
            .with_status(200)
            .with_body(r#"{"Managers": "#)
            .create();

        let err = transport_for(&server)
            .get("/redfish/v1/", &Auth::Token("tok-123".to_string()))
            .unwrap_err();
        assert!(matches!(err, RedfishError::Decode { .. }));
        assert_eq!(err.kind(), crate::redfish::ErrorKind::Local);
    }

    #[test]
    fn test_delete_session_sends_token_to_location() {
        let mut server = Server::new();
        let logout = server
            .mock("DELETE", "/redfish/v1/SessionService/Sessions/7")
            .match_header("x-auth-token", "tok-123")
            .with_status(204)
            .create();

        let session = Session::new(
            "tok-123".to_string(),
            "/redfish/v1/SessionService/Sessions/7".to_string(),
        );
        transport_for(&server).delete_session(&session).unwrap();
        logout.assert();
    }

    #[test]
    fn test_delete_session_failure_is_reported() {
        let mut server = Server::new();
        let _logout = server
            .mock("DELETE", "/redfish/v1/SessionService/Sessions/7")
            .with_status(503)
            .create();

        let session = Session::new(
            "tok-123".to_string(),
            "/redfish/v1/SessionService/Sessions/7".to_string(),
        );
        let err = transport_for(&server).delete_session(&session).unwrap_err();
        assert!(matches!(err, RedfishError::Status { status: 503, .. }));
    }
}
