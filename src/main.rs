use calendar_today::{run, Config};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = Config::load().and_then(|config| {
        info!(timezone = %config.timezone, "Updating calendar");
        run(&config)
    });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
