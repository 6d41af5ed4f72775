//! Value types shared by the rental engine, the invoice gateway client and the server.
mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, CURRENCY_CODE};
pub use secret::Secret;
