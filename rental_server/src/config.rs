use std::{env, fmt::Display, str::FromStr, time::Duration};

use invoice_gateway::XenditConfig;
use log::*;
use rental_common::helpers::parse_boolean_flag;
use rental_engine::{RentalFlowOptions, DEFAULT_INVOICE_EXPIRY_HOURS, DEFAULT_TOPUP_EXPIRY_SECS};

use crate::errors::ServerError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/rentals.db";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// If false, the expiry sweeper is not started. Useful when several hosts share one database.
    pub run_sweeper: bool,
    /// How often the expiry sweeper runs.
    pub sweep_interval: Duration,
    /// How long an invoice-funded booking holds its copy before the sweeper releases it.
    pub invoice_expiry: chrono::Duration,
    /// The lifetime, in seconds, of wallet top-up invoices.
    pub topup_expiry_secs: u32,
    /// Capacity of each event hook channel.
    pub event_buffer_size: usize,
    pub xendit: XenditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_sweeper: true,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            invoice_expiry: chrono::Duration::hours(DEFAULT_INVOICE_EXPIRY_HOURS),
            topup_expiry_secs: DEFAULT_TOPUP_EXPIRY_SECS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            xendit: XenditConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("RENTAL_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ RENTAL_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = read_env_or_default("RENTAL_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let run_sweeper = parse_boolean_flag(env::var("RENTAL_RUN_SWEEPER").ok(), true);
        let sweep_interval =
            Duration::from_secs(read_env_or_default("RENTAL_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS));
        let invoice_expiry =
            chrono::Duration::hours(read_env_or_default("RENTAL_INVOICE_EXPIRY_HOURS", DEFAULT_INVOICE_EXPIRY_HOURS));
        let topup_expiry_secs = read_env_or_default("RENTAL_TOPUP_EXPIRY_SECS", DEFAULT_TOPUP_EXPIRY_SECS);
        let event_buffer_size = read_env_or_default("RENTAL_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let xendit = XenditConfig::new_from_env_or_default();
        Self {
            database_url,
            max_connections,
            run_sweeper,
            sweep_interval,
            invoice_expiry,
            topup_expiry_secs,
            event_buffer_size,
            xendit,
        }
    }

    /// Rejects settings that would leave the engine unable to work at all.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.database_url.trim().is_empty() {
            return Err(ServerError::ConfigurationError("The database URL is empty".into()));
        }
        if self.max_connections == 0 {
            return Err(ServerError::ConfigurationError("RENTAL_DB_MAX_CONNECTIONS must be at least 1".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(ServerError::ConfigurationError("RENTAL_SWEEP_INTERVAL_SECS must be at least 1".into()));
        }
        if self.invoice_expiry <= chrono::Duration::zero() {
            return Err(ServerError::ConfigurationError("RENTAL_INVOICE_EXPIRY_HOURS must be positive".into()));
        }
        if self.event_buffer_size == 0 {
            return Err(ServerError::ConfigurationError("RENTAL_EVENT_BUFFER_SIZE must be at least 1".into()));
        }
        Ok(())
    }

    pub fn rental_flow_options(&self) -> RentalFlowOptions {
        RentalFlowOptions { invoice_expiry: self.invoice_expiry }
    }
}

fn read_env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    parse_or_default(name, env::var(name).ok(), default)
}

fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        None => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e} Using the default, {default}, instead.");
            default
        }),
    }
}
