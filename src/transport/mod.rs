//! The `transport` module is responsible for handling network communication
//! with clients and publishers.
//!
//! It defines the frames exchanged over the wire, the WebSocket subscribe
//! endpoint that hands each upgraded connection to a [`Session`], and the
//! HTTP publish endpoint that feeds the broker.
//!
//! [`Session`]: crate::session::Session

pub mod message;
pub mod publish;
pub mod server;
pub mod websocket;

pub use server::{AppState, router, serve};
