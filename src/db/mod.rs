// ABOUTME: Database module exports for Redis Console
// ABOUTME: Client traits shared by the Redis wrapper and the test keyspace

pub mod redis;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::config::ConnectionRecord;
use crate::models::{KeyType, StreamEntry};

pub use self::redis::{ClientError, ClientErrorKind, RedisConnector, RedisHandle, RedisSession};

/// Opens connected sessions for saved connections.
///
/// Every action opens its own session and releases it before returning;
/// nothing is pooled.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: KeyspaceSession;

    async fn connect(&self, record: &ConnectionRecord, db: u8)
        -> Result<Self::Session, ClientError>;
}

/// The commands the console issues against a connected keyspace
#[async_trait]
pub trait KeyspaceSession: Send + Sync {
    async fn ping(&self) -> Result<(), ClientError>;

    /// One SCAN step: next cursor plus the keys of this step
    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        count: u32,
    ) -> Result<(String, Vec<String>), ClientError>;

    async fn key_type(&self, key: &str) -> Result<KeyType, ClientError>;

    async fn ttl(&self, key: &str) -> Result<i64, ClientError>;

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    async fn hash_entries(&self, key: &str) -> Result<Vec<(String, String)>, ClientError>;

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ClientError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ClientError>;

    /// Members and scores in rank order
    async fn zset_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, String)>, ClientError>;

    /// Oldest `count` entries of a stream
    async fn stream_range(&self, key: &str, count: usize)
        -> Result<Vec<StreamEntry>, ClientError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool, ClientError>;

    async fn persist(&self, key: &str) -> Result<bool, ClientError>;

    async fn delete(&self, key: &str) -> Result<bool, ClientError>;

    /// Release the session. Dropping it releases too; this also logs.
    async fn disconnect(self);
}
