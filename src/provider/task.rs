//! # Resource Tasks
//!
//! A [`ResourceTask`] is the handle a provider returns for one fetch. [`SpawnedTask`] is the
//! tokio-backed implementation: the future is created eagerly but only spawned on `resume`, and
//! `cancel` aborts it. An aborted task never reports a result.

use crate::framework::Exclusive;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle controlling one in-flight fetch.
pub trait ResourceTask: Send + Sync {
    /// Starts (or restarts) the fetch.
    fn resume(&self);

    /// Pauses the fetch. Implementations that cannot pause leave it running, so a later
    /// `resume` always ends in a completion or a `cancel`.
    fn suspend(&self);

    /// Cancels the fetch. Best-effort; a cancelled task should not report a result.
    fn cancel(&self);

    /// Completion in `[0, 1]`.
    fn progress(&self) -> f64;
}

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

enum TaskState {
    Pending(BoxFuture),
    Running(JoinHandle<()>),
    Cancelled,
}

/// A fetch future spawned on a tokio runtime when resumed.
pub struct SpawnedTask {
    handle: Handle,
    state: Exclusive<TaskState>,
}

impl SpawnedTask {
    pub(crate) fn new(handle: Handle, future: BoxFuture) -> Self {
        Self {
            handle,
            state: Exclusive::new(TaskState::Pending(future)),
        }
    }
}

impl ResourceTask for SpawnedTask {
    fn resume(&self) {
        self.state.execute(|state| {
            if matches!(state, TaskState::Pending(_)) {
                if let TaskState::Pending(future) =
                    std::mem::replace(state, TaskState::Cancelled)
                {
                    *state = TaskState::Running(self.handle.spawn(future));
                }
            }
        });
    }

    /// No-op: a spawned future cannot be paused, and cancelling here would leave the owning
    /// resource waiting for a completion that never comes.
    fn suspend(&self) {}

    fn cancel(&self) {
        let previous = self
            .state
            .execute(|state| std::mem::replace(state, TaskState::Cancelled));
        if let TaskState::Running(join) = previous {
            join.abort();
        }
    }

    fn progress(&self) -> f64 {
        self.state.execute(|state| match state {
            TaskState::Running(join) if join.is_finished() => 1.0,
            TaskState::Pending(_) | TaskState::Running(_) | TaskState::Cancelled => 0.0,
        })
    }
}

impl fmt::Debug for SpawnedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.execute(|state| match state {
            TaskState::Pending(_) => "pending",
            TaskState::Running(_) => "running",
            TaskState::Cancelled => "cancelled",
        });
        f.debug_struct("SpawnedTask").field("state", &state).finish()
    }
}
