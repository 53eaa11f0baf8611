//! Process-level wiring: sharing resources and initializing logging.
//!
//! # Main Components
//!
//! - [`ResourceDirectory`] - Hands out one shared [`Resource`](crate::framework::Resource) per cache key
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod directory;
pub mod tracing;

pub use directory::ResourceDirectory;
pub use tracing::{setup_tracing, try_setup_tracing};
