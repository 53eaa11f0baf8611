//! # Resource
//!
//! A [`Resource`] is the fetch-and-cache state machine for one configuration. It owns the last
//! known [`ResourceState`], at most one in-flight fetch and the set of live observers.
//!
//! ## Fetch decision
//!
//! Every `observe` evaluates the cached state for the new observer, unless a fetch is already
//! running (dedup: the new observer just receives that fetch's result):
//!
//! | State | Expired | Action |
//! |-------|---------|--------|
//! | `Initial` | - | fetch with the aggressive configuration |
//! | `Data` | no | emit the cached response to this observer only |
//! | `Data` | yes | fetch with the aggressive configuration |
//! | `Error` | - | fetch with the normal configuration |
//!
//! ## Locking
//!
//! All bookkeeping happens inside one [`Exclusive`] executor. Providers are invoked and
//! callbacks are delivered *outside* it: the completion snapshots the observer list, releases
//! the lock, fans out, and only then clears the in-flight record. A callback is therefore free
//! to call `observe`, `refresh` or release its token.
//!
//! Every fetch carries a generation number. A completion whose generation is no longer the
//! in-flight one (its task was cancelled in the meantime) is ignored.

use crate::configuration::{Expiration, ResourceConfiguration};
use crate::framework::observable::Observable;
use crate::framework::observer::{ExecutionContext, Observer, ObserverId};
use crate::framework::response::{is_success, FetchResult, ResourceState};
use crate::framework::sync::Exclusive;
use crate::framework::token::CancellationToken;
use crate::provider::{Completion, ResourceProvider, ResourceTask};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};

enum Phase {
    /// The request is being built and handed to the provider.
    Starting,
    Running(Arc<dyn ResourceTask>),
    /// The result is stored and being fanned out.
    Completing,
}

struct InFlight {
    generation: u64,
    phase: Phase,
}

/// A fetch the executor decided to start.
#[derive(Debug, Clone, Copy)]
struct Fetch {
    generation: u64,
    aggressive: bool,
}

enum Decision<T, E> {
    Emit(FetchResult<T, E>),
    Fetch(Fetch),
    Skip,
}

struct Core<T, E> {
    state: ResourceState<T, E>,
    last_success: Option<Instant>,
    in_flight: Option<InFlight>,
    /// A fetch requested while the previous one was fanning out.
    follow_up: Option<bool>,
    observers: Vec<Arc<Observer<T, E>>>,
    next_generation: u64,
}

impl<T: Clone, E: Clone> Core<T, E> {
    fn begin(&mut self, aggressive: bool) -> Fetch {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.in_flight = Some(InFlight {
            generation,
            phase: Phase::Starting,
        });
        Fetch {
            generation,
            aggressive,
        }
    }

    fn is_expired(&self, expiration: Expiration) -> bool {
        expiration.is_expired(self.last_success)
    }

    /// `Some(aggressive)` when the cached state calls for a fetch.
    fn needs_fetch(&self, expiration: Expiration) -> Option<bool> {
        match &self.state {
            ResourceState::Initial => Some(true),
            ResourceState::Data(_) if self.is_expired(expiration) => Some(true),
            ResourceState::Data(_) => None,
            ResourceState::Error(_) => Some(false),
        }
    }

    fn decide(&mut self, expiration: Expiration) -> Decision<T, E> {
        match self.completing() {
            None => match self.needs_fetch(expiration) {
                Some(aggressive) => Decision::Fetch(self.begin(aggressive)),
                None => self.cached(),
            },
            // The fresh state is already stored but this observer is not in the fan-out.
            Some(true) => match self.needs_fetch(expiration) {
                Some(aggressive) => {
                    self.follow_up = Some(self.follow_up.unwrap_or(false) || aggressive);
                    Decision::Skip
                }
                None => self.cached(),
            },
            Some(false) => Decision::Skip,
        }
    }

    /// `None` when idle, otherwise whether the in-flight fetch is fanning out.
    fn completing(&self) -> Option<bool> {
        self.in_flight
            .as_ref()
            .map(|in_flight| matches!(in_flight.phase, Phase::Completing))
    }

    fn cached(&self) -> Decision<T, E> {
        match &self.state {
            ResourceState::Data(response) => Decision::Emit(Ok(response.clone())),
            ResourceState::Initial | ResourceState::Error(_) => Decision::Skip,
        }
    }
}

struct Shared<C: ResourceConfiguration, P> {
    configuration: C,
    provider: Arc<P>,
    core: Exclusive<Core<C::Value, C::Error>>,
    resource_type: &'static str,
    cache_key: Option<String>,
}

impl<C, P> Shared<C, P>
where
    C: ResourceConfiguration,
    P: ResourceProvider<Request = C::Request>,
{
    fn start(self: &Arc<Self>, fetch: Fetch) {
        let configuration = if fetch.aggressive {
            self.configuration.aggressive()
        } else {
            self.configuration.clone()
        };

        info!(
            resource_type = self.resource_type,
            cache_key = ?self.cache_key,
            generation = fetch.generation,
            aggressive = fetch.aggressive,
            "Fetch started"
        );

        let request = match configuration.build_request() {
            Ok(request) => request,
            Err(e) => {
                warn!(resource_type = self.resource_type, error = %e, "Request build failed");
                self.complete(fetch.generation, Err(e));
                return;
            }
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let generation = fetch.generation;
        let completion: Completion<C::Value, C::Error> = Box::new(move |result| {
            if let Some(shared) = weak.upgrade() {
                shared.complete(generation, result);
            }
        });

        let task = self.provider.perform(request, configuration, completion);

        let stored = self.core.execute(|core| match &mut core.in_flight {
            Some(in_flight)
                if in_flight.generation == generation
                    && matches!(in_flight.phase, Phase::Starting) =>
            {
                in_flight.phase = Phase::Running(Arc::clone(&task));
                true
            }
            _ => false,
        });

        if stored {
            task.resume();
        } else {
            debug!(
                resource_type = self.resource_type,
                generation, "Fetch abandoned before start"
            );
            task.cancel();
        }
    }

    fn complete(self: &Arc<Self>, generation: u64, result: FetchResult<C::Value, C::Error>) {
        let snapshot = self.core.execute(|core| {
            let in_flight = core.in_flight.as_mut()?;
            if in_flight.generation != generation || matches!(in_flight.phase, Phase::Completing) {
                return None;
            }
            in_flight.phase = Phase::Completing;

            let state = ResourceState::from_result(result.clone());
            core.last_success = state.is_success().then(Instant::now);
            core.state = state;
            Some(core.observers.clone())
        });

        let Some(observers) = snapshot else {
            debug!(
                resource_type = self.resource_type,
                generation, "Stale completion ignored"
            );
            return;
        };

        info!(
            resource_type = self.resource_type,
            cache_key = ?self.cache_key,
            generation,
            success = is_success(&result),
            observers = observers.len(),
            "Fetch completed"
        );

        for observer in &observers {
            observer.emit(result.clone());
        }

        let follow_up = self.core.execute(|core| {
            if matches!(&core.in_flight, Some(in_flight) if in_flight.generation == generation) {
                core.in_flight = None;
            }
            match core.follow_up.take() {
                Some(aggressive) if core.in_flight.is_none() && !core.observers.is_empty() => {
                    Some(core.begin(aggressive))
                }
                _ => None,
            }
        });

        if let Some(fetch) = follow_up {
            debug!(resource_type = self.resource_type, "Starting deferred fetch");
            self.start(fetch);
        }
    }

    fn remove_observer(&self, id: ObserverId) {
        let cancelled = self.core.execute(|core| {
            core.observers.retain(|observer| observer.id() != id);
            if !core.observers.is_empty() {
                return None;
            }
            core.follow_up = None;
            core.in_flight.take()
        });

        debug!(resource_type = self.resource_type, observer = %id, "Observer removed");

        if let Some(InFlight {
            generation,
            phase: Phase::Running(task),
        }) = cancelled
        {
            info!(
                resource_type = self.resource_type,
                generation, "Last observer gone, cancelling fetch"
            );
            task.cancel();
        }
    }
}

/// The fetch-and-cache state machine for one configuration.
///
/// Cloning is cheap and yields a handle to the same resource.
pub struct Resource<C: ResourceConfiguration, P> {
    shared: Arc<Shared<C, P>>,
}

impl<C, P> Resource<C, P>
where
    C: ResourceConfiguration,
    P: ResourceProvider<Request = C::Request>,
{
    pub fn new(configuration: C, provider: Arc<P>) -> Self {
        let resource_type = std::any::type_name::<C::Value>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        let cache_key = configuration.cache_key();

        Self {
            shared: Arc::new(Shared {
                configuration,
                provider,
                core: Exclusive::new(Core {
                    state: ResourceState::Initial,
                    last_success: None,
                    in_flight: None,
                    follow_up: None,
                    observers: Vec::new(),
                    next_generation: 0,
                }),
                resource_type,
                cache_key,
            }),
        }
    }

    pub fn configuration(&self) -> &C {
        &self.shared.configuration
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> ResourceState<C::Value, C::Error> {
        self.shared.core.execute(|core| core.state.clone())
    }

    pub fn is_resource_expired(&self) -> bool {
        let expiration = self.shared.configuration.expiration();
        self.shared.core.execute(|core| core.is_expired(expiration))
    }

    /// True when both handles point to the same resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.shared.core.execute(|core| core.observers.len())
    }
}

impl<C, P> Observable for Resource<C, P>
where
    C: ResourceConfiguration,
    P: ResourceProvider<Request = C::Request>,
{
    type Value = C::Value;
    type Error = C::Error;

    fn observe_on<F>(&self, context: ExecutionContext, callback: F) -> CancellationToken
    where
        F: Fn(FetchResult<C::Value, C::Error>) + Send + Sync + 'static,
    {
        let observer = Arc::new(Observer::new(context, Arc::new(callback)));
        let id = observer.id();
        let expiration = self.shared.configuration.expiration();

        let decision = self.shared.core.execute(|core| {
            core.observers.push(Arc::clone(&observer));
            core.decide(expiration)
        });

        match decision {
            Decision::Emit(result) => {
                debug!(resource_type = self.shared.resource_type, observer = %id, "Cache hit");
                observer.emit(result);
            }
            Decision::Fetch(fetch) => self.shared.start(fetch),
            Decision::Skip => {
                debug!(
                    resource_type = self.shared.resource_type,
                    observer = %id,
                    "Joined in-flight fetch"
                );
            }
        }

        let weak = Arc::downgrade(&self.shared);
        CancellationToken::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.remove_observer(id);
            }
        })
    }

    fn refresh(&self) {
        let fetch = self.shared.core.execute(|core| {
            if core.observers.is_empty() {
                return None;
            }
            match core.completing() {
                None => Some(core.begin(true)),
                Some(true) => {
                    core.follow_up = Some(true);
                    None
                }
                Some(false) => None,
            }
        });

        match fetch {
            Some(fetch) => self.shared.start(fetch),
            None => debug!(
                resource_type = self.shared.resource_type,
                "Refresh skipped"
            ),
        }
    }

    fn is_running(&self) -> bool {
        self.shared.core.execute(|core| core.in_flight.is_some())
    }
}

impl<C: ResourceConfiguration, P> Clone for Resource<C, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ResourceConfiguration + fmt::Debug, P> fmt::Debug for Resource<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (observers, running) = self
            .shared
            .core
            .execute(|core| (core.observers.len(), core.in_flight.is_some()));
        f.debug_struct("Resource")
            .field("configuration", &self.shared.configuration)
            .field("observers", &observers)
            .field("running", &running)
            .finish()
    }
}
