//! dotstrap CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use dotstrap::cli::{Cli, CommandDispatcher, Settings};
use dotstrap::error::DotstrapError;
use dotstrap::shell::signal;
use dotstrap::ui::create_ui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `-v` sets INFO, `-vv` sets DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is WARN
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dotstrap=warn")),
        1 => EnvFilter::new("dotstrap=info"),
        _ => EnvFilter::new("dotstrap=debug"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    signal::install_handler();

    tracing::debug!("dotstrap starting with args: {:?}", cli);

    let settings = Settings::from_cli(&cli);
    let mut ui = create_ui(settings.interactive, settings.display);
    let dispatcher = CommandDispatcher::new(settings);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            if matches!(e, DotstrapError::UserCancelled) {
                let _ = console::Term::stderr().show_cursor();
            }
            ui.error(&format!("Error: {}", e));
            if let Some(hint) = e.hint() {
                ui.hint(&hint);
            }
            ExitCode::from(1)
        }
    }
}
