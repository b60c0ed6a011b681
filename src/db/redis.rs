// ABOUTME: Redis connection management using the redis crate
// ABOUTME: Short-lived lazy handles, classified errors and the key commands

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, ConnectionInfo, IntoConnectionInfo, Value};
use thiserror::Error;

use super::{Connector, KeyspaceSession};
use crate::config::{ClientPolicy, ConnectionRecord};
use crate::models::{KeyType, StreamEntry};

/// Structured classification of a client failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The URL could not be parsed into connection settings
    InvalidUrl,
    /// Connect timeout elapsed
    Timeout,
    /// Refused, unreachable, dropped or any other transport failure
    Connection,
    /// The server answered with an error
    Command,
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ClientError {
    kind: ClientErrorKind,
    message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ClientErrorKind {
        self.kind
    }

    /// True when the server could not be reached, so the user should go back
    /// to the connections screen
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self.kind,
            ClientErrorKind::Timeout | ClientErrorKind::Connection
        )
    }
}

impl From<redis::RedisError> for ClientError {
    fn from(error: redis::RedisError) -> Self {
        let kind = if error.is_timeout() {
            ClientErrorKind::Timeout
        } else if error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_io_error()
        {
            ClientErrorKind::Connection
        } else if error.kind() == redis::ErrorKind::InvalidClientConfig {
            ClientErrorKind::InvalidUrl
        } else {
            ClientErrorKind::Command
        };
        Self::new(kind, error.to_string())
    }
}

/// Parse a redis:// URL and point it at logical database `db`
pub fn connection_info(url: &str, db: u8) -> Result<ConnectionInfo, ClientError> {
    let mut info = url
        .into_connection_info()
        .map_err(|e| ClientError::new(ClientErrorKind::InvalidUrl, e.to_string()))?;
    info.redis.db = i64::from(db);
    Ok(info)
}

/// A client handle that has not connected yet.
///
/// Opening never touches the network; [`RedisHandle::connect`] does.
pub struct RedisHandle {
    client: Client,
    policy: ClientPolicy,
    label: String,
}

impl RedisHandle {
    pub fn open(
        record: &ConnectionRecord,
        db: u8,
        policy: ClientPolicy,
    ) -> Result<Self, ClientError> {
        let info = connection_info(&record.url, db)?;
        let client = Client::open(info)?;
        Ok(Self {
            client,
            policy,
            label: format!("{} (db {})", record.name, db),
        })
    }

    /// Connect within the policy timeout. No retries; the caller decides.
    pub async fn connect(&self) -> Result<RedisSession, ClientError> {
        log::debug!("Connecting to {}", self.label);

        let connecting = self.client.get_multiplexed_async_connection();
        let mut connection = tokio::time::timeout(self.policy.connect_timeout, connecting)
            .await
            .map_err(|_| {
                ClientError::new(
                    ClientErrorKind::Timeout,
                    format!(
                        "Connection timed out after {} ms",
                        self.policy.connect_timeout.as_millis()
                    ),
                )
            })??;

        if self.policy.ready_check {
            let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        }

        Ok(RedisSession {
            connection,
            label: self.label.clone(),
        })
    }
}

/// A connected Redis session. Dropping it closes the connection.
pub struct RedisSession {
    connection: MultiplexedConnection,
    label: String,
}

impl RedisSession {
    fn conn(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

/// [`Connector`] backed by real Redis servers
#[derive(Debug, Clone, Default)]
pub struct RedisConnector {
    policy: ClientPolicy,
}

impl RedisConnector {
    pub fn new(policy: ClientPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ClientPolicy {
        self.policy
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Session = RedisSession;

    async fn connect(&self, record: &ConnectionRecord, db: u8) -> Result<RedisSession, ClientError> {
        RedisHandle::open(record, db, self.policy)?.connect().await
    }
}

/// Redis keys and values are binary; anything that is not UTF-8 is shown
/// with replacement characters rather than failing the whole reply.
fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn lossy_all(items: Vec<Vec<u8>>) -> Vec<String> {
    items.into_iter().map(lossy).collect()
}

/// Split a SCAN reply into the next cursor and the key names
fn scan_reply(reply: &Value) -> Result<(String, Vec<String>), ClientError> {
    let (cursor, keys): (String, Vec<Vec<u8>>) = redis::from_redis_value(reply)?;
    Ok((cursor, lossy_all(keys)))
}

fn into_pairs<T>(flat: Vec<T>) -> Vec<(T, T)> {
    let mut pairs = Vec::with_capacity(flat.len() / 2);
    let mut items = flat.into_iter();
    while let (Some(first), Some(second)) = (items.next(), items.next()) {
        pairs.push((first, second));
    }
    pairs
}

#[async_trait]
impl KeyspaceSession for RedisSession {
    async fn ping(&self) -> Result<(), ClientError> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn()).await?;
        Ok(())
    }

    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        count: u32,
    ) -> Result<(String, Vec<String>), ClientError> {
        let reply: Value = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut self.conn())
            .await?;
        scan_reply(&reply)
    }

    async fn key_type(&self, key: &str) -> Result<KeyType, ClientError> {
        let type_name: String = redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(KeyType::from_redis_type(&type_name))
    }

    async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        let ttl: i64 = redis::cmd("TTL")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(value.map(lossy))
    }

    async fn hash_entries(&self, key: &str) -> Result<Vec<(String, String)>, ClientError> {
        let flat: Vec<Vec<u8>> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(into_pairs(lossy_all(flat)))
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ClientError> {
        let items: Vec<Vec<u8>> = redis::cmd("LRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut self.conn())
            .await?;
        Ok(lossy_all(items))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ClientError> {
        let members: Vec<Vec<u8>> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(lossy_all(members))
    }

    async fn zset_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, String)>, ClientError> {
        let flat: Vec<Vec<u8>> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES")
            .query_async(&mut self.conn())
            .await?;
        Ok(into_pairs(lossy_all(flat)))
    }

    async fn stream_range(
        &self,
        key: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, ClientError> {
        let entries: Vec<(String, Vec<Vec<u8>>)> = redis::cmd("XRANGE")
            .arg(key)
            .arg("-")
            .arg("+")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut self.conn())
            .await?;
        Ok(entries
            .into_iter()
            .map(|(id, fields)| StreamEntry {
                id,
                fields: into_pairs(lossy_all(fields)),
            })
            .collect())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut self.conn())
            .await?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool, ClientError> {
        let changed: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .query_async(&mut self.conn())
            .await?;
        Ok(changed == 1)
    }

    async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        let changed: i64 = redis::cmd("PERSIST")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(changed == 1)
    }

    async fn delete(&self, key: &str) -> Result<bool, ClientError> {
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.conn())
            .await?;
        Ok(removed > 0)
    }

    async fn disconnect(self) {
        log::debug!("Disconnecting from {}", self.label);
        drop(self.connection);
    }
}
