//! Connection parameter resolution
//!
//! Values given on the command line win. Anything omitted falls back to an
//! INI file (default `config.ini`) shaped like:
//!
//! ```ini
//! [DEFAULT]
//! BmcIp = 10.0.0.5
//! BmcUsername = USERID
//! BmcUserpassword = PASSW0RD
//! ; optional
//! Auth = session
//! CaFile = /etc/ssl/bmc-ca.pem
//! ```
//!
//! Section and key names match case-insensitively. Blank values count as
//! unset. Values are taken literally: backslashes and quotes are kept, so
//! `DOMAIN\user` stays `DOMAIN\user`.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use config::{FileStoredFormat, Format, Map, Source, Value, ValueKind};
use ini::{Ini, ParseOption};
use thiserror::Error;
use tracing::debug;

use crate::redfish::AuthMode;

/// Config file used when `--config-file` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// INI section holding the connection settings.
pub const DEFAULT_SECTION: &str = "DEFAULT";

pub const KEY_IP: &str = "BmcIp";
pub const KEY_USERNAME: &str = "BmcUsername";
pub const KEY_PASSWORD: &str = "BmcUserpassword";
pub const KEY_AUTH: &str = "Auth";
pub const KEY_CAFILE: &str = "CaFile";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("missing {key}: pass it on the command line or set it in {}", .path.display())]
    Missing { key: &'static str, path: PathBuf },

    #[error("invalid {key} in {}: {reason}", .path.display())]
    Invalid {
        key: &'static str,
        path: PathBuf,
        reason: String,
    },
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub ip: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth: Option<AuthMode>,
    pub cafile: Option<PathBuf>,
}

/// Everything needed to reach and authenticate against one BMC.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub ip: String,
    pub username: String,
    pub password: String,
    pub auth: AuthMode,
    pub cafile: Option<PathBuf>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("ip", &self.ip)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("auth", &self.auth)
            .field("cafile", &self.cafile)
            .finish()
    }
}

impl ConnectionParams {
    /// Merge command-line values over the config file.
    ///
    /// A missing config file is not an error by itself; it only fails if a
    /// required value was also left off the command line.
    pub fn resolve(overrides: &CliOverrides, config_file: &Path) -> Result<Self, ConfigError> {
        let file = FileSettings::load(config_file)?;
        let required = |value: &Option<String>, key: &'static str| {
            non_blank(value.clone())
                .or_else(|| file.get(key))
                .ok_or_else(|| ConfigError::Missing {
                    key,
                    path: config_file.to_path_buf(),
                })
        };

        let ip = required(&overrides.ip, KEY_IP)?;
        let username = required(&overrides.username, KEY_USERNAME)?;
        let password = required(&overrides.password, KEY_PASSWORD)?;

        let auth = match overrides.auth {
            Some(mode) => mode,
            None => match file.get(KEY_AUTH) {
                Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                    key: KEY_AUTH,
                    path: config_file.to_path_buf(),
                    reason,
                })?,
                None => AuthMode::default(),
            },
        };

        let cafile = overrides
            .cafile
            .clone()
            .or_else(|| file.get(KEY_CAFILE).map(PathBuf::from));

        let params = Self {
            ip,
            username,
            password,
            auth,
            cafile,
        };
        debug!(?params, "Resolved connection parameters");
        Ok(params)
    }
}

/// Flattened, lower-cased view of the settings in a config file.
#[derive(Debug, Default)]
struct FileSettings {
    values: HashMap<String, String>,
}

impl FileSettings {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            debug!(path = %path.display(), "Config file not found; using command-line values only");
            return Ok(Self::default());
        }

        let load_err = |source| ConfigError::Load {
            path: path.to_path_buf(),
            source,
        };
        let table = config::Config::builder()
            .add_source(config::File::new(&path.to_string_lossy(), LiteralIni))
            .build()
            .map_err(load_err)?
            .collect()
            .map_err(load_err)?;

        // Top-level keys first so the DEFAULT section overrides them.
        let mut values = HashMap::new();
        let mut section = None;
        for (key, value) in table {
            if key.eq_ignore_ascii_case(DEFAULT_SECTION) {
                section = value.into_table().ok();
            } else if let Ok(text) = value.into_string() {
                values.insert(key.to_ascii_lowercase(), text);
            }
        }
        for (key, value) in section.into_iter().flatten() {
            if let Ok(text) = value.into_string() {
                values.insert(key.to_ascii_lowercase(), text);
            }
        }

        debug!(path = %path.display(), keys = values.len(), "Loaded config file");
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Option<String> {
        non_blank(self.values.get(&key.to_ascii_lowercase()).cloned())
    }
}

/// INI format with escape and quote processing turned off.
#[derive(Debug, Clone, Copy)]
struct LiteralIni;

impl Format for LiteralIni {
    fn parse(
        &self,
        uri: Option<&String>,
        text: &str,
    ) -> Result<Map<String, Value>, Box<dyn StdError + Send + Sync>> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(text, options)?;

        let string = |v: &str| Value::new(uri, ValueKind::String(v.to_owned()));
        let mut map = Map::new();
        for (section, props) in ini.iter() {
            match section {
                Some(name) => {
                    let table = props.iter().map(|(k, v)| (k.to_owned(), string(v))).collect();
                    map.insert(name.to_owned(), Value::new(uri, ValueKind::Table(table)));
                }
                None => {
                    for (k, v) in props.iter() {
                        map.insert(k.to_owned(), string(v));
                    }
                }
            }
        }
        Ok(map)
    }
}

impl FileStoredFormat for LiteralIni {
    fn file_extensions(&self) -> &'static [&'static str] {
        &["ini"]
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
