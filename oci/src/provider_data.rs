//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::waiter::DEFAULT_POLL_INTERVAL;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct OciProviderData {
    pub client: Arc<Client>,
    pub region: String,
    /// Interval between lifecycle polls while waiting on create and delete
    pub poll_interval: Duration,
}

impl OciProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            region: client.region().to_string(),
            client: Arc::new(client),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
