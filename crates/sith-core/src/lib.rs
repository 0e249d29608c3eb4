//! Core types, configuration and errors for the SITH tumor growth simulation.

pub mod types;
pub mod config;
pub mod error;

pub use error::{ConfigError, Error, InvariantViolation, Result};
pub use types::*;
pub use config::*;
