use saas_pull::config::LoggingConfig;
use saas_pull::{logging, Config, Runner};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::from_env();

    // Log with defaults if the config itself is unusable, so the failure is still recorded.
    let logging_config = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    if let Err(e) = logging::init(&logging_config) {
        eprintln!("saas-pull: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("saas-pull starting...");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration could not be loaded. Exiting");
            return ExitCode::FAILURE;
        }
    };

    let mut runner = match Runner::new(&config) {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "Invalid configuration. Edit the config file. Exiting");
            return ExitCode::FAILURE;
        }
    };

    match runner.run().await {
        Ok(summary) => {
            info!(events = summary.total_events(), "Run complete. Exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
