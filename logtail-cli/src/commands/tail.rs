use std::io::{self, Write};

use crate::client::LogClient;
use crate::session::StreamUpdate;
use crate::view::numbered;

/// Stream a file to stdout until Ctrl+C or the stream fails
pub async fn run_tail(mut client: LogClient, line_numbers: bool) -> io::Result<()> {
    if let Err(error) = client.start().await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }

    if let Some(target) = client.session().target() {
        eprintln!(
            "Streaming '{}' from {} ({})... (Ctrl+C to stop)\n",
            target.file, target.host.name, target.host.url
        );
    }

    let mut stdout = io::stdout().lock();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                client.stop();
                eprintln!("\nStopped.");
                return Ok(());
            }
            update = client.pump() => match update {
                StreamUpdate::Appended => {
                    let logs = client.session().logs();
                    if let Some(line) = logs.last() {
                        if line_numbers {
                            let number = logs.first_line_number() + logs.len() - 1;
                            writeln!(stdout, "{}", numbered(number, 6, &line.text))?;
                        } else {
                            writeln!(stdout, "{}", line.text)?;
                        }
                    }
                }
                StreamUpdate::Sentinel => {
                    if let Some(error) = client.error() {
                        eprintln!("\x1b[33m{}\x1b[0m", error);
                    }
                }
                StreamUpdate::Failed => {
                    if let Some(error) = client.error() {
                        eprintln!("\n\x1b[31mError: {}\x1b[0m", error);
                    }
                    std::process::exit(1);
                }
                StreamUpdate::Ignored => {}
            },
        }
    }
}
