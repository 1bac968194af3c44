//! Polls a resource until it reaches a lifecycle state

use crate::api::ApiError;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tfplug::Context;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timeout after {elapsed:?} waiting for {what} to reach {target} (last state: {last_state})")]
    Timeout {
        what: String,
        target: String,
        last_state: String,
        elapsed: Duration,
    },

    #[error("{what} entered unexpected state {state} while waiting for {target}")]
    UnexpectedState {
        what: String,
        state: String,
        target: String,
    },

    #[error("wait for {0} was cancelled")]
    Cancelled(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Target and pending states plus timing for one wait
#[derive(Debug, Clone)]
pub struct StateWait<S> {
    pub target: Vec<S>,
    pub pending: Vec<S>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Treat a 404 as reaching the target (deletes)
    pub not_found_is_target: bool,
}

impl<S> StateWait<S> {
    pub fn new(target: Vec<S>, pending: Vec<S>, timeout: Duration) -> Self {
        Self {
            target,
            pending,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            not_found_is_target: false,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn not_found_is_target(mut self) -> Self {
        self.not_found_is_target = true;
        self
    }
}

fn join_states<S: Display>(states: &[S]) -> String {
    states
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Calls `fetch` until `state_of` returns a target state. Returns the last
/// fetched object, or None when it disappeared and `not_found_is_target`
/// is set.
pub async fn wait_for_state<T, S, F, Fut>(
    ctx: &Context,
    what: &str,
    wait: &StateWait<S>,
    fetch: F,
    state_of: impl Fn(&T) -> S,
) -> Result<Option<T>, WaitError>
where
    S: PartialEq + Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let start = Instant::now();
    let deadline_ctx = ctx.with_timeout(wait.timeout);
    let target = join_states(&wait.target);
    let mut last_state = "none".to_string();

    loop {
        match fetch().await {
            Ok(item) => {
                let state = state_of(&item);
                tracing::debug!("{} is {}, waiting for {}", what, state, target);

                if wait.target.contains(&state) {
                    return Ok(Some(item));
                }
                if !wait.pending.contains(&state) {
                    return Err(WaitError::UnexpectedState {
                        what: what.to_string(),
                        state: state.to_string(),
                        target,
                    });
                }
                last_state = state.to_string();
            }
            Err(e) if e.is_not_found() && wait.not_found_is_target => {
                tracing::debug!("{} no longer exists", what);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        tokio::select! {
            _ = tokio::time::sleep(wait.poll_interval) => {}
            _ = deadline_ctx.cancelled() => {}
        }

        if ctx.is_cancelled() {
            return Err(WaitError::Cancelled(what.to_string()));
        }
        if deadline_ctx.is_cancelled() {
            tracing::warn!("Gave up waiting for {} after {:?}", what, start.elapsed());
            return Err(WaitError::Timeout {
                what: what.to_string(),
                target,
                last_state,
                elapsed: start.elapsed(),
            });
        }
    }
}
