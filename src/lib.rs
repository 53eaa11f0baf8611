#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Fetch Engine
//!
//! > **Observe a remote resource once, share the fetch everywhere.**
//!
//! This crate coordinates client-side fetching and caching. A [`Resource`](framework::Resource)
//! owns the state of one logical fetch: every caller that observes it shares one in-flight
//! request and one cached result, and the fetch is cancelled as soon as nobody is observing.
//!
//! ## Core Concepts
//!
//! ### Observe, don't request
//! Callers never "send a request". They [`observe`](framework::Observable::observe) a resource and
//! receive every result through a callback until they release the returned
//! [`CancellationToken`](framework::CancellationToken). The resource decides whether to emit a
//! cached value or to fetch, based on its state and its [`Expiration`](configuration::Expiration).
//!
//! ### Decorators by composition
//! Retry and recovery are not resource subclasses: they wrap anything that implements
//! [`Observable`](framework::Observable), so they stack in any order.
//!
//! ```rust,ignore
//! let user = directory
//!     .get_resource(user_configuration)
//!     .with_recovery(login, |result| is_unauthorized(result), store_session)
//!     .with_retry_after(3, Backoff::Exponential(Duration::from_millis(100)));
//!
//! let _token = user.observe(|result| println!("{result:?}"));
//! ```
//!
//! ## Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Raw failures are a cloneable [`FetchError`](framework::FetchError) (sources are shared
//! behind `Arc`), so a single result can be fanned out to many observers. Mapped domain errors
//! travel inside [`Response::Error`](framework::Response::Error), never as raw failures.
//!
//! ### 2. Concurrency Model
//! Each resource guards its state with one mutual-exclusion executor, but never holds it while
//! calling the provider or a callback. Callbacks may re-enter the resource freely. Providers may
//! complete on any thread.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured logging.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The resource state machine, observers, tokens and the result types.
//!
//! ### 2. The Description ([`configuration`])
//! What to fetch and how to map it: [`ResourceConfiguration`](configuration::ResourceConfiguration),
//! transformers and the ready-made [`EndpointConfiguration`](configuration::EndpointConfiguration).
//!
//! ### 3. The Plumbing ([`provider`])
//! Who performs the fetch: [`ResourceProvider`](provider::ResourceProvider) and the
//! transport-driven [`DataProvider`](provider::DataProvider).
//!
//! ### 4. The Policies ([`decorators`])
//! [`RetryResource`](decorators::RetryResource), [`RecoveryResource`](decorators::RecoveryResource)
//! and the [`Backoff`](decorators::Backoff) functions.
//!
//! ### 5. The Wiring ([`lifecycle`])
//! The shared [`ResourceDirectory`](lifecycle::ResourceDirectory) and tracing setup.
//!
//! ### Running Tests
//!
//! ```bash
//! RUST_LOG=debug cargo test
//! ```

pub mod configuration;
pub mod decorators;
pub mod framework;
pub mod lifecycle;
pub mod provider;
