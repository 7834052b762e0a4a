//! files server binary entry point.
//!
//! Listens for uploads on the given port and stores them in the working
//! directory (or `--dir`).

use clap::Parser;
use tracing::{error, info};

use files_server::{Cli, FileListener};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = files_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "files-server starting");

    let listener = match FileListener::bind(cli.server_config()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(
                addr = %cli.socket_addr(),
                dir = %cli.dir.display(),
                error = %e,
                "Could not start listening"
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = listener.run().await {
        error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}
