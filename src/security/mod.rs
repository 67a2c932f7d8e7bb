//! Security utilities module
//!
//! Keeps BMC credentials and session tokens out of logs.

pub mod logging;
