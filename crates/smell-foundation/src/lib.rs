//! Foundation Layer - Core types and error definitions
//!
//! This crate provides the building blocks shared by every smellscope crate:
//! - `model`: the closed set of smell kinds and the total `SmellConfig` mapping
//! - `protocol`: inbound request and outbound response documents
//! - `error`: the pipeline error taxonomy and the wire error body

pub mod error;
pub mod model;
pub mod protocol;

// Re-export commonly used types for convenience
pub use error::*;
pub use model::*;
pub use protocol::*;
