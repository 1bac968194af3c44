//! Request-scoped context: cancellation, deadlines and values
//!
//! Every async trait method takes a Context as its first parameter so long
//! running work (lifecycle polling in particular) can stop when Terraform
//! gives up on the request.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;

#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    values: Arc<RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>>,
    done_tx: Arc<watch::Sender<bool>>,
    done: watch::Receiver<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            deadline: None,
            values: Arc::new(RwLock::new(HashMap::new())),
            done_tx: Arc::new(done_tx),
            done,
        }
    }

    /// Derives a context that is cancelled after `timeout`, or earlier if
    /// this context is cancelled. Values are shared with the parent.
    /// The earlier of the two deadlines wins; a timeout too large to
    /// represent as an instant adds no deadline of its own.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (Instant::now().checked_add(timeout), self.deadline) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        };

        let (done_tx, done) = watch::channel(*self.done.borrow());
        let done_tx = Arc::new(done_tx);

        let child_tx = done_tx.clone();
        let mut parent_done = self.done.clone();
        tokio::spawn(async move {
            let expired = async {
                match deadline {
                    Some(at) => time::sleep_until(at.into()).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = expired => {}
                _ = wait_for_true(&mut parent_done) => {}
                _ = child_tx.closed() => return,
            }
            let _ = child_tx.send(true);
        });

        Self {
            deadline,
            values: self.values.clone(),
            done_tx,
            done,
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        self.values
            .write()
            .await
            .insert(key.to_string(), Box::new(value));
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, None when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let mut done = self.done.clone();
        wait_for_true(&mut done).await;
    }

    pub fn cancel(&self) {
        let _ = self.done_tx.send(true);
    }
}

async fn wait_for_true(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|done| *done).await.is_err() {
        // sender dropped without cancelling: never resolves
        std::future::pending::<()>().await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
