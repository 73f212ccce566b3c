use std::process::ExitCode;
use std::time::Duration;

use crate::{
    configuration::Configuration, configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface, http::create_app, local_slots::LocalSlots,
};
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod backend;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_slots;
mod schema;
mod slot_file;
#[cfg(test)]
mod testutils;
mod types;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, %address, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    info!(%address, "Slot booking server listening");

    let app = if let Some(database_url) = configuration.database_url() {
        let pool_size = configuration.database_pool_size();
        let backend = loop {
            let url = database_url.clone();
            match tokio::task::spawn_blocking(move || DatabaseInterface::new(&url, pool_size)).await
            {
                Ok(Ok(backend)) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Ok(Err(err)) => {
                    error!(%err, "Failed to establish database connection. Retry in 1 sec.");
                }
                Err(err) => {
                    error!(?err, "Database connection task failed. Retry in 1 sec.");
                }
            }
            sleep(Duration::from_secs(1)).await;
        };
        create_app(backend, configuration)
    } else if let Some(data_file) = configuration.data_file() {
        let backend = match LocalSlots::with_file(&data_file) {
            Ok(backend) => backend,
            Err(err) => {
                error!(%err, path = %data_file.display(), "Failed to load data file");
                return ExitCode::FAILURE;
            }
        };
        info!(path = %data_file.display(), "Using JSON data file");
        create_app(backend, configuration)
    } else {
        info!("No database or data file configured, slots are kept in memory only");
        create_app(LocalSlots::default(), configuration)
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
