//! FTPS Client - Entry Point
//!
//! Interactive explicit-TLS FTP client: connects, upgrades the control
//! channel, logs in and reads commands from standard input.

use log::{error, info};
use std::process::ExitCode;
use tokio::io::{BufReader, stderr, stdin, stdout};

use ftps_client::error::handle_error;
use ftps_client::utils::logging::setup_logging;
use ftps_client::{ClientConfig, Dispatcher, FtpsSession, TrustContext};

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let trust = match TrustContext::from_config(&config.server, &config.tls) {
        Ok(trust) => trust,
        Err(e) => {
            handle_error(&e);
            return ExitCode::FAILURE;
        }
    };

    info!("Connecting to {}...", config.server.control_address());
    let mut session = match FtpsSession::establish(&config, trust).await {
        Ok(session) => session,
        Err(e) => {
            handle_error(&e);
            return ExitCode::FAILURE;
        }
    };

    let mut dispatcher = Dispatcher::new(BufReader::new(stdin()), stdout(), stderr());
    match dispatcher.run(&mut session).await {
        Ok(()) => {
            info!("Session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            handle_error(&e);
            ExitCode::FAILURE
        }
    }
}
