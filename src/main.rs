use log::{error, info, LevelFilter};
use rocket::Error as RocketError;
use thiserror::Error;

/// Logging configuration used unless `SSC_LOG_CONFIG` names another file.
const DEFAULT_LOG_CONFIG: &str = "log4rs.yaml";

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Rocket(#[from] RocketError),
}

async fn run() -> Result<(), Error> {
    info!("Preparing election server...");
    let rocket = ssc_evoting_backend::build().ignite().await?;
    info!(
        "...ready with profile '{}' and {} routes",
        rocket.config().profile,
        rocket.routes().count()
    );
    // Our own fairing logs requests from here on.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    let _ = rocket.launch().await?;
    Ok(())
}

#[rocket::main]
async fn main() {
    let log_config =
        std::env::var("SSC_LOG_CONFIG").unwrap_or_else(|_| DEFAULT_LOG_CONFIG.to_string());
    log4rs::init_file(&log_config, log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Logging configured from {log_config}");

    if let Err(err) = run().await {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
