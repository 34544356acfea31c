use socket_client::error::EXIT_OK;
use socket_client::logger;
use socket_client::session;

use std::process::ExitCode;

use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match session::run().await {
        Ok(_) => {
            info!("Socket client exited cleanly");
            ExitCode::from(EXIT_OK)
        }
        Err(e) => {
            if e.exit_code() == EXIT_OK {
                info!("{e}");
            } else if logger::is_installed() {
                error!("{e}");
            } else {
                // Config and logger failures happen before any log output exists.
                eprintln!("{e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
