use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zwave_console_controller::SerialController;
use zwave_console_core::{Session, VERSION, default_config_path, run_console};
use zwave_console_serial_link::SystemPorts;
use zwave_console_spec_tables::CommandClassSpecification;

// ── CLI definition ───────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "zwave-console",
    version,
    about = "Interactive console for Z-Wave serial controllers"
)]
struct Cli {
    /// Path to a command class specification (JSON). When omitted, uses the
    /// tables bundled with the binary.
    spec: Option<PathBuf>,
}

const BANNER: &str = r"===========================================================================
                  _____      __        __
                 |__  /      \ \      / /_ ___   _____
                   / /  _____ \ \ /\ / / _` \ \ / / _ \
                  / /_ |_____| \ V  V / (_| |\ V /  __/
                 /____|         \_/\_/ \__,_| \_/ \___|   console
 --------------------------------------------------------------------------
              send commands directly to the z-wave controller
===========================================================================";

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let spec = match &cli.spec {
        Some(path) => CommandClassSpecification::from_path(path).with_context(|| {
            format!("failed to load command class specification from {}", path.display())
        })?,
        None => CommandClassSpecification::bundled()
            .context("failed to load bundled command class specification")?,
    };
    tracing::info!(
        classes = spec.command_classes.len(),
        schema = %spec.schema_version,
        "specification loaded"
    );

    let session = Session::new(
        Arc::new(SerialController::new()),
        Arc::new(spec),
        Arc::new(SystemPorts::new()),
        default_config_path(),
    );

    let stdout = io::stdout();
    {
        let mut out = stdout.lock();
        writeln!(out, "{BANNER}")?;
        writeln!(out, "v{VERSION}")?;
        writeln!(out)?;
        writeln!(out, "Ready! Please type command (type 'help' for command list):")?;
    }

    let stdin = io::stdin();
    run_console(&session, stdin.lock(), stdout.lock()).context("console input failed")
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
