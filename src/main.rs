use std::process::ExitCode;

use clap::Parser;
use redfish_vmedia::cli::{self, Cli};
use redfish_vmedia::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(&cli.log_config()) {
        eprintln!("warning: {e}");
    }
    cli::run(&cli)
}
