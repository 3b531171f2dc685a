use std::process::ExitCode;

use clap::Parser;
use docserve::{Config, ServerError};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

// SIGPIPE is already ignored: the Rust runtime sets it to SIG_IGN before
// `main`, so a peer closing mid-write only fails that connection with EPIPE.
fn main() -> ExitCode {
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(config.log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("can't install log subscriber: {e}");
    }

    let server = match config.into_server() {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "invalid configuration");
            eprintln!("docserve: {e}");
            return ExitCode::FAILURE;
        }
    };

    match server.run_blocking() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e {
                ServerError::Bind { .. } => error!(cause = %e, "bind server error"),
                _ => error!(cause = %e, "server stopped"),
            }
            eprintln!("docserve: {e}");
            ExitCode::FAILURE
        }
    }
}
