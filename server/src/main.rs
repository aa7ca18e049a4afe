use std::process::ExitCode;

use clap::Parser;
use mock_http_server::{Cli, Listener, ServerConfig, WorkerPool};
use tracing::{error, info};

fn main() -> ExitCode {
    let config = ServerConfig::from(Cli::parse());

    if let Err(err) = shared::init_logging() {
        eprintln!("Failed to initialise logging: {err}");
        return ExitCode::FAILURE;
    }

    info!(
        component = "main",
        phase = "startup",
        addr = %config.socket_addr(),
        threads = config.threads,
        image = %config.image_path.display(),
    );

    let pool = WorkerPool::new(config.threads);
    let result = pool.block_on(async {
        Listener::bind(&config, pool.clone()).await?.serve().await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(component = "main", error = %err, "Server stopped");
            ExitCode::FAILURE
        }
    }
}
