//! redfish-vmedia library
//!
//! Enumerates the virtual media devices a BMC exposes under its managers and
//! systems, using the Redfish REST API. The `get-virtual-media` binary is a
//! thin wrapper over [`cli::run`].

pub mod cli;
pub mod config;
pub mod inventory;
pub mod logging;
pub mod redfish;
pub mod security;

pub use crate::config::{CliOverrides, ConfigError, ConnectionParams};
pub use crate::inventory::{
    collect_virtual_media, get_virtual_media, TraversalEvent, VirtualMediaRecord,
};
pub use crate::redfish::{
    Auth, AuthMode, ErrorKind, HttpTransport, RedfishError, Session, SessionGuard, Transport,
};
