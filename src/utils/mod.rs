//! The `utils` module provides the pieces shared by every other module of
//! the gateway: the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{GatewayError, Result};

#[cfg(test)]
mod tests;
