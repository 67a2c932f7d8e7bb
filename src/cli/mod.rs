//! Command-line interface
//!
//! `get-virtual-media [-i IP] [-u USER] [-p PASSWORD] [--config-file PATH]`
//!
//! Records are printed to stdout as pretty JSON as they are discovered.
//! Notices and diagnostics go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{error, warn};

use crate::config::{CliOverrides, ConnectionParams, DEFAULT_CONFIG_FILE};
use crate::inventory::{get_virtual_media, TraversalEvent};
use crate::logging::{LogConfig, LogFormat};
use crate::redfish::{AuthMode, HttpTransport, RedfishError};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nGit commit: ",
    env!("VMEDIA_GIT_HASH"),
    "\nBuild date: ",
    env!("VMEDIA_BUILD_DATE"),
);

/// List the virtual media attached to a BMC's managers and systems.
#[derive(Parser, Debug)]
#[command(
    name = "get-virtual-media",
    version = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about = "List the virtual media attached to a BMC's managers and systems over Redfish"
)]
pub struct Cli {
    /// BMC address, optionally with a port.
    #[arg(short, long)]
    pub ip: Option<String>,

    /// BMC user name.
    #[arg(short, long)]
    pub username: Option<String>,

    /// BMC password.
    #[arg(short, long)]
    pub password: Option<String>,

    /// INI file supplying any connection value not given above.
    #[arg(long, visible_alias = "config_file", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Authenticate with a Redfish session (default) or HTTP basic auth.
    #[arg(long, value_enum)]
    pub auth: Option<AuthMode>,

    /// PEM bundle used to verify the BMC certificate. Verification is
    /// skipped when omitted.
    #[arg(long)]
    pub cafile: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            ip: self.ip.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            auth: self.auth,
            cafile: self.cafile.clone(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_verbosity(self.verbose, self.log_format)
    }
}

/// Run the tool end to end and map the outcome to an exit code.
pub fn run(cli: &Cli) -> ExitCode {
    if execute(cli) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the tool end to end. Returns `false` if the run failed; the
/// diagnostic has already been printed.
pub fn execute(cli: &Cli) -> bool {
    let params = match ConnectionParams::resolve(&cli.overrides(), &cli.config_file) {
        Ok(params) => params,
        Err(e) => {
            error!(error = %e, "Could not resolve connection parameters");
            eprintln!("Error: {e}");
            return false;
        }
    };

    let outcome = HttpTransport::new(&params.ip, params.cafile.as_deref()).and_then(|transport| {
        let mut out = io::stdout().lock();
        let mut err = io::stderr();
        get_virtual_media(&transport, &params, |event| {
            if let Err(e) = report_event(&event, &mut out, &mut err) {
                warn!(error = %e, "Failed to write output");
            }
        })
    });

    match outcome {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Virtual media query failed");
            // Nothing more to do if stderr itself is gone.
            let _ = report_failure(&e, &mut io::stderr());
            false
        }
    }
}

/// Print one traversal event: records to `out`, notices to `err`.
pub fn report_event<O: Write, E: Write>(
    event: &TraversalEvent<'_>,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    match event {
        TraversalEvent::Record { record, .. } => {
            let text = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
            writeln!(out, "{text}")?;
            out.flush()
        }
        TraversalEvent::EmptyCollection { owner } => {
            writeln!(err, "No virtual media found under {owner}")
        }
    }
}

/// Print the operator-facing diagnostic for a failed run.
pub fn report_failure<W: Write>(error: &RedfishError, w: &mut W) -> io::Result<()> {
    writeln!(w, "{}", error.diagnostic())
}
