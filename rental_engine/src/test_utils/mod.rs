//! Helpers for tests of the engine and of the crates built on it.
mod fixtures;
mod mock_gateway;
#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub use fixtures::{seed_book, seed_user};
pub use mock_gateway::{MockGateway, MOCK_CALLBACK_TOKEN};
#[cfg(feature = "sqlite")]
pub use prepare_env::{prepare_test_env, random_db_path, tear_down};
