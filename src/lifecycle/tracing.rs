//! # Observability & Tracing
//!
//! The [`setup_tracing`] function initializes structured logging with the `tracing` crate.
//!
//! ## Configuration
//!
//! The engine uses a compact format that hides the crate/module prefix (`with_target(false)`).
//! Log lines carry a `resource_type` field instead, derived from the mapped value type.
//!
//! ## What Gets Traced
//!
//! - **Fetch lifecycle** (`info`): fetch started, fetch completed, cancelled with no observers
//! - **Observer decisions** (`debug`): cache hit, joined in-flight fetch, refresh skipped
//! - **Decorators**: retry scheduled (`info`), retry exhausted (`warn`), recovery outcome
//! - **Directory**: resource registered (`info`), type mismatch replaced (`warn`)
//!
//! ## Usage Examples
//!
//! ```bash
//! # Fetch lifecycle only
//! RUST_LOG=info cargo test
//!
//! # Every observer decision
//! RUST_LOG=fetch_engine=debug cargo test
//! ```
//!
//! **With `RUST_LOG=debug`**:
//!
//! ```text
//! INFO Fetch started resource_type="User" cache_key=Some("user") generation=1 aggressive=true
//! DEBUG Joined in-flight fetch resource_type="User" observer=observer_2
//! INFO Fetch completed resource_type="User" cache_key=Some("user") generation=1 success=true observers=2
//! DEBUG Cache hit resource_type="User" observer=observer_3
//! ```

/// Initializes the global subscriber from `RUST_LOG`.
///
/// # Panics
/// When a global subscriber is already installed. Use [`try_setup_tracing`] from tests.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // resource_type replaces module paths
        .compact()
        .init();
}

/// Like [`setup_tracing`], but returns `false` instead of panicking when a subscriber is
/// already installed.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
