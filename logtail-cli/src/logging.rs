// Structured logging for the CLI.
//
// Activation:
//   - RUST_LOG=debug (or any EnvFilter directive)
//   - --debug
//   - `log_level:` in logtail.yaml
//
// Output: stderr for line-oriented commands. The TUI owns the terminal, so
// there logs go to --log-file or nowhere.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Where log records are written
pub enum LogSink<'a> {
    Stderr,
    File(&'a Path),
    Discard,
}

/// Priority: RUST_LOG > --debug > config level > "info".
pub fn init(debug_flag: bool, config_level: Option<&str>, sink: LogSink<'_>) -> io::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    };

    let (writer, ansi) = match sink {
        LogSink::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        LogSink::Discard => (BoxMakeWriter::new(io::sink), false),
    };

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .compact()
        .try_init();

    tracing::debug!(
        app = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "logging initialised"
    );
    Ok(())
}
