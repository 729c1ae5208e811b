//! # Subgate
//!
//! `subgate` is a real-time topic subscription gateway. Clients keep a
//! WebSocket open, declare interest in named topics, and receive whatever
//! producers publish to those topics over plain HTTP. Every state-changing
//! client action is put to an external authorizer first.
//!
//! ## Core Modules
//!
//! - `broker`: in-memory registry of subscribers and topics, and the fan-out.
//! - `session`: per-connection state machine with its inbound and outbound loops.
//! - `authorizer`: the allow/deny contract and its webhook implementation.
//! - `transport`: the axum router, the subscribe and publish endpoints, and wire frames.
//! - `config`: layered configuration loading.
//! - `utils`: shared error type and logging setup.

pub mod authorizer;
pub mod broker;
pub mod config;
pub mod session;
pub mod transport;
pub mod utils;
