//! # Rental engine host
//! This crate hosts the book rental engine as a long-running process. It is responsible for:
//! * Creating and migrating the database on startup.
//! * Wiring the engine APIs to the database and the invoice gateway client ([`services::RentalServices`]).
//! * Logging engine events through the event hooks.
//! * Running the expiry sweeper that cancels unpaid bookings and releases their copies.
//!
//! ## Configuration
//! The host is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod expiry_worker;
pub mod hooks;
pub mod server;
pub mod services;
