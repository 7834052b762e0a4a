//! files client binary entry point.

use clap::Parser;
use tracing::error;

use files_client::{Cli, FileSender};
use files_core::LogFormat;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = files_core::init_logging(cli.verbose, None, LogFormat::Text) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let sender = FileSender::new(cli.server.as_str()).with_level(cli.level);
    match sender.upload(&cli.file, cli.name.as_deref()).await {
        Ok(result) => println!("{}", result.resolved),
        Err(e) => {
            error!(file = %cli.file.display(), server = %cli.server, error = %e, "Upload failed");
            std::process::exit(1);
        }
    }
}
