use std::io;

use logtail_core::suggest::SuggestionIndex;

use crate::client::LogClient;

/// Print the active host's files, filtered like the autocomplete list
pub async fn run_files(mut client: LogClient, query: Option<&str>) -> io::Result<()> {
    if let Err(error) = client.wait_files().await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }

    let host = client
        .registry()
        .active()
        .map(|h| format!("{} ({})", h.name, h.url))
        .unwrap_or_default();

    let mut index = SuggestionIndex::new();
    let matches = index.update(client.files(), query.unwrap_or(""));

    if matches.is_empty() {
        match query {
            Some(q) => println!("No files on {} match '{}'", host, q),
            None => println!("No files on {}", host),
        }
        return Ok(());
    }

    println!("Files on {}:\n", host);
    for file in matches {
        println!("  {}", file);
    }
    Ok(())
}
