//! landgrab -- a territory conquest engine speaking a line protocol.
//!
//! This binary reads commands from stdin and writes responses to stdout.
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` to adjust.

use std::io::{self, BufRead};

use landgrab::protocol::parser::parse_command;
use landgrab::session::Session;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Runs the main protocol loop, reading commands from stdin
/// and writing responses to stdout.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut session = Session::default();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        match session.dispatch(cmd, &mut out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!(error = %e, "failed to write response");
                break;
            }
        }
    }
}
