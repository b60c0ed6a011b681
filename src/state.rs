// ABOUTME: Console context handed to every action
// ABOUTME: Bundles the connection store with the client connector

use crate::config::{ConnectionStore, ConsoleConfig, StoreError};
use crate::db::{Connector, RedisConnector};

/// Explicit context for the action layer. There is no global state: callers
/// build one `Console` and pass it into each action.
pub struct Console<C = RedisConnector> {
    store: ConnectionStore,
    connector: C,
}

impl Console<RedisConnector> {
    /// Console backed by real Redis servers
    pub fn open(config: &ConsoleConfig) -> Result<Self, StoreError> {
        let store = ConnectionStore::open(config)?;
        log::info!("Using connections file {}", store.path().display());
        Ok(Self::new(store, RedisConnector::new(config.client)))
    }
}

impl<C: Connector> Console<C> {
    pub fn new(store: ConnectionStore, connector: C) -> Self {
        Self { store, connector }
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}
