//! # Handle to an accepted invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::TaskError;
use crate::tasks::TaskResult;

/// Future resolving to the result of an invocation accepted by
/// [`Scheduler::run`](crate::Scheduler::run).
///
/// A body that finished during `run` (every sync body, callbacks signalled
/// inline) yields its stored result. Otherwise the invocation runs on the tokio
/// runtime whether or not this handle is awaited; dropping it only discards the
/// result.
#[derive(Debug)]
pub struct Invocation {
    id: Arc<str>,
    state: State,
}

#[derive(Debug)]
enum State {
    Done(TaskResult),
    Spawned(JoinHandle<TaskResult>),
}

impl Invocation {
    pub(crate) fn ready(id: Arc<str>, res: TaskResult) -> Self {
        Self {
            id,
            state: State::Done(res),
        }
    }

    pub(crate) fn spawned(id: Arc<str>, join: JoinHandle<TaskResult>) -> Self {
        Self {
            id,
            state: State::Spawned(join),
        }
    }

    /// Id reported in this invocation's events.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True once the invocation has completed.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Done(_) => true,
            State::Spawned(join) => join.is_finished(),
        }
    }
}

impl Future for Invocation {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Done(res) => Poll::Ready(res.clone()),
            State::Spawned(join) => Pin::new(join).poll(cx).map(|joined| match joined {
                Ok(res) => res,
                Err(e) if e.is_panic() => Err(TaskError::from_panic(e.into_panic())),
                Err(_) => Err(TaskError::Canceled),
            }),
        }
    }
}
