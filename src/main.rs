use std::process::ExitCode;

use relay_reactor::{Server, ServerConfig, get_logger};

/// `relay-server [config.json]`
fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };

    let logger = get_logger("relay.server", &config.log);

    let result = Server::bind(config, logger.clone()).and_then(Server::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger.error(&format!("Relay server error: {}", e));
            ExitCode::FAILURE
        }
    }
}
