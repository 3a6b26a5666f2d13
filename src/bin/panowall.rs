use std::process::ExitCode;
use std::sync::Arc;

use env_logger::Env;
use log::LevelFilter;
use panowall::{ConsoleProgress, RunConfig, RunController, spawn_shutdown_listener};
use tokio_util::sync::CancellationToken;

fn setup_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        // Connection pool chatter drowns the progress line
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logger();

    let root_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::error!("Cannot determine the working directory: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = RunConfig::new().with_root_dir(root_dir);

    let cancel = CancellationToken::new();
    let listener = spawn_shutdown_listener(cancel.clone());

    let controller =
        match RunController::new(config, Arc::new(ConsoleProgress::stdout()), cancel) {
            Ok(controller) => controller,
            Err(e) => {
                log::error!("Failed to set up HTTP client: {e}");
                return ExitCode::FAILURE;
            }
        };

    let report = controller.run().await;
    listener.abort();

    ExitCode::from(report.outcome.exit_code())
}
