//! Core pairing and relay logic for the BlindBuddy anonymous chat bot.
//!
//! This crate is intentionally transport-agnostic. Telegram lives behind the
//! messaging port (trait) implemented in the adapter crate.

pub mod chat;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod logging;
pub mod matcher;
pub mod messaging;
pub mod relay;
pub mod session;
pub mod store;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
