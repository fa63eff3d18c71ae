//! Connection lifecycle controller.
//!
//! Two states: [`ConnectionState::Disconnected`] (initial) and
//! [`ConnectionState::Connected`]. The controller is the only owner of the
//! adapter's connection handle; operations borrow it through
//! [`ConnectionLifecycle::ensure_connected`].

use tidewire_types::ConnectorError;

use crate::adapter::Adapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Owns one adapter and at most one live connection handle.
pub struct ConnectionLifecycle<A: Adapter> {
    adapter: A,
    handle: Option<A::Handle>,
    /// Successful connects so far. Changes whenever a new handle is created.
    generation: u64,
    invalidations: u64,
}

impl<A: Adapter> ConnectionLifecycle<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            handle: None,
            generation: 0,
            invalidations: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.handle.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Number of handles created over this controller's life.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of handles discarded by [`invalidate`](Self::invalidate).
    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Connect if disconnected, then lend out the adapter and its live handle.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's `connect` error unchanged; the controller
    /// stays disconnected.
    pub async fn ensure_connected(&mut self) -> Result<(&mut A, &mut A::Handle), ConnectorError> {
        let handle = match self.handle {
            Some(ref mut handle) => handle,
            None => {
                let handle = self.adapter.connect().await?;
                self.generation += 1;
                if self.generation > 1 {
                    tracing::info!(
                        backend = self.adapter.name(),
                        generation = self.generation,
                        "Reconnected"
                    );
                } else {
                    tracing::debug!(backend = self.adapter.name(), "Connected");
                }
                self.handle.insert(handle)
            }
        };
        Ok((&mut self.adapter, handle))
    }

    /// Discard the handle without a clean close; it is presumed broken.
    ///
    /// The next [`ensure_connected`](Self::ensure_connected) reconnects from scratch.
    pub fn invalidate(&mut self) {
        if self.handle.take().is_some() {
            self.invalidations += 1;
            tracing::warn!(
                backend = self.adapter.name(),
                generation = self.generation,
                "Connection invalidated"
            );
        }
    }

    /// Close the connection if one exists. Idempotent and never fails.
    pub async fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.adapter.disconnect(handle).await;
            tracing::debug!(backend = self.adapter.name(), "Disconnected");
        }
    }
}
