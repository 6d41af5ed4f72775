use invoice_gateway::XenditApi;
use log::*;
use rental_common::helpers::redact_url_credentials;
use rental_engine::{RentalStore, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    hooks::create_audit_event_handlers,
    services::RentalServices,
};

/// A running host: the wired-up engine plus the background sweeper, if it was started.
pub struct RentalServer {
    pub services: RentalServices<SqliteDatabase, XenditApi>,
    db: SqliteDatabase,
    sweeper: Option<JoinHandle<()>>,
}

impl RentalServer {
    /// Opens (creating and migrating if necessary) the database, starts the event handlers and the expiry sweeper.
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let db = open_database(&config).await?;
        let gateway = XenditApi::new(config.xendit.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let handlers = create_audit_event_handlers(config.event_buffer_size);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let services = RentalServices::new(db.clone(), gateway, producers.clone(), &config);
        let sweeper = if config.run_sweeper {
            let api = rental_engine::ExpiryApi::new(db.clone(), producers);
            Some(start_expiry_worker(api, config.sweep_interval))
        } else {
            info!("🕰️ The expiry sweeper is disabled on this host");
            None
        };
        Ok(Self { services, db, sweeper })
    }

    pub fn database(&self) -> &SqliteDatabase {
        &self.db
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
            debug!("🕰️ Expiry worker stopped");
        }
        self.db.close().await?;
        info!("🚀️ Database connections closed");
        Ok(())
    }
}

pub async fn open_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    let url = config.database_url.as_str();
    info!("🚀️ Opening database at {}", redact_url_credentials(url));
    SqliteDatabase::create_if_missing(url).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    Ok(db)
}

/// Runs the host until Ctrl-C is pressed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let server = RentalServer::start(config).await?;
    info!("🚀️ Rental engine is running. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutting down");
    server.shutdown().await
}
