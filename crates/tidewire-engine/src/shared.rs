//! Mutual exclusion for hosts that dispatch calls concurrently.
//!
//! A connector's handle must never be read by one call while another
//! invalidates or replaces it. [`Shared`] holds the connector behind an async
//! mutex for the whole call, including every retry.

use std::sync::Arc;

use tidewire_types::{ConnectorError, Record};
use tokio::sync::Mutex;

use crate::connector::{Destination, Source};

/// Clonable, lock-guarded connector.
pub struct Shared<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Shared<C> {
    pub fn new(connector: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(connector)),
        }
    }
}

impl<C> Clone for Shared<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Source> Source for Shared<C> {
    async fn retrieve(&mut self) -> Result<Vec<Record>, ConnectorError> {
        self.inner.lock().await.retrieve().await
    }

    async fn stop(&mut self) {
        self.inner.lock().await.stop().await;
    }
}

impl<C: Destination> Destination for Shared<C> {
    async fn insert(&mut self, record: &Record) -> Result<(), ConnectorError> {
        self.inner.lock().await.insert(record).await
    }

    async fn stop(&mut self) {
        self.inner.lock().await.stop().await;
    }
}
