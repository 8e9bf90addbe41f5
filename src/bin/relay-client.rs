use std::io::BufRead;
use std::process::ExitCode;

use relay_reactor::{Client, ClientConfig, ConsoleSink, get_logger};

/// `relay-client [config.json]`: relays stdin lines to the server and prints
/// everything the server sends back.
fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match ClientConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };

    let logger = get_logger("relay.client", &config.log);

    let mut client = match Client::connect(&config, ConsoleSink, logger.clone()) {
        Ok(client) => client,
        Err(e) => {
            logger.error(&format!("Relay client error: {}", e));
            return ExitCode::FAILURE;
        }
    };

    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                logger.error(&format!("Failed to read stdin: {}", e));
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        if let Err(e) = client.send(&line) {
            logger.error(&format!("Relay client error: {}", e));
            return ExitCode::FAILURE;
        }
        if client.is_receiver_finished() {
            logger.warn("Server connection closed.");
            break;
        }
    }

    match client.shutdown() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&format!("Relay client error: {}", e));
            ExitCode::FAILURE
        }
    }
}
