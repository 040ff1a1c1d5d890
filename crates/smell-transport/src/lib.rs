//! smell-transport: HTTP surface for the analysis pipeline

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, TransportError};
pub use server::{router, serve, shutdown_signal, start_server, AppState};
