//! Core library for the agent relay
//!
//! This crate contains the pieces shared by every relay surface:
//! - Runtime configuration
//! - Agent Engine client and event decoding
//! - Sender to session bookkeeping

pub mod agent;
pub mod config;
pub mod error;
pub mod session;

pub use config::RelayConfig;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
