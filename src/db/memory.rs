// ABOUTME: In-memory keyspace used by the unit tests
// ABOUTME: Implements the client traits with SCAN, TYPE and TTL semantics close to Redis

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ClientError, ClientErrorKind, Connector, KeyspaceSession};
use crate::config::ConnectionRecord;
use crate::models::{KeyType, StreamEntry};

#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    String(String),
    Hash(Vec<(String, String)>),
    List(Vec<String>),
    Set(Vec<String>),
    Zset(Vec<(String, String)>),
    Stream(Vec<StreamEntry>),
    Module(String),
}

impl MemoryValue {
    fn key_type(&self) -> KeyType {
        match self {
            MemoryValue::String(_) => KeyType::String,
            MemoryValue::Hash(_) => KeyType::Hash,
            MemoryValue::List(_) => KeyType::List,
            MemoryValue::Set(_) => KeyType::Set,
            MemoryValue::Zset(_) => KeyType::Zset,
            MemoryValue::Stream(_) => KeyType::Stream,
            MemoryValue::Module(name) => KeyType::Other(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub value: MemoryValue,
    /// Seconds left, None when the key never expires
    pub ttl: Option<i64>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keys in insertion order, which is also SCAN order
    entries: Vec<(String, MemoryEntry)>,
    /// When set, every connect attempt fails with this kind
    unreachable: Option<ClientErrorKind>,
    /// When set, every command after connect fails with this kind
    failing_commands: Option<ClientErrorKind>,
    connected_dbs: Vec<u8>,
}

impl Inner {
    fn entry(&self, key: &str) -> Option<&MemoryEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, entry)| entry)
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut MemoryEntry> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == key)
            .map(|(_, entry)| entry)
    }
}

/// Shared keyspace; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyspace {
    inner: Arc<Mutex<Inner>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryKeyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: MemoryValue, ttl: Option<i64>) {
        let mut inner = self.inner.lock().unwrap();
        let entry = MemoryEntry { value, ttl };
        match inner.entry_mut(key) {
            Some(existing) => *existing = entry,
            None => inner.entries.push((key.to_string(), entry)),
        }
    }

    pub fn entry(&self, key: &str) -> Option<MemoryEntry> {
        self.inner.lock().unwrap().entry(key).cloned()
    }

    pub fn set_unreachable(&self, kind: Option<ClientErrorKind>) {
        self.inner.lock().unwrap().unreachable = kind;
    }

    pub fn set_failing_commands(&self, kind: Option<ClientErrorKind>) {
        self.inner.lock().unwrap().failing_commands = kind;
    }

    /// Databases requested by each successful connect, in order
    pub fn connected_dbs(&self) -> Vec<u8> {
        self.inner.lock().unwrap().connected_dbs.clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            keyspace: self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    keyspace: MemoryKeyspace,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, _record: &ConnectionRecord, db: u8) -> Result<MemorySession, ClientError> {
        let mut inner = self.keyspace.inner.lock().unwrap();
        if let Some(kind) = inner.unreachable {
            return Err(ClientError::new(kind, "connect ECONNREFUSED 127.0.0.1:6379"));
        }
        inner.connected_dbs.push(db);
        self.keyspace.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            keyspace: self.keyspace.clone(),
        })
    }
}

pub struct MemorySession {
    keyspace: MemoryKeyspace,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.keyspace.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemorySession {
    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T, ClientError> {
        let mut inner = self.keyspace.inner.lock().unwrap();
        if let Some(kind) = inner.failing_commands {
            return Err(ClientError::new(kind, "Connection is closed."));
        }
        Ok(f(&mut inner))
    }

    fn read<T>(
        &self,
        key: &str,
        f: impl FnOnce(&MemoryValue) -> Option<T>,
    ) -> Result<Option<T>, ClientError> {
        let found = self.with_inner(|inner| inner.entry(key).map(|entry| f(&entry.value)))?;
        match found {
            Some(None) => Err(ClientError::new(
                ClientErrorKind::Command,
                "WRONGTYPE Operation against a key holding the wrong kind of value",
            )),
            Some(Some(value)) => Ok(Some(value)),
            None => Ok(None),
        }
    }
}

fn slice_range<T: Clone>(items: &[T], start: isize, stop: isize) -> Vec<T> {
    let len = items.len() as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop {
        return Vec::new();
    }
    items[start as usize..=stop as usize].to_vec()
}

/// Glob match supporting `*`, `?` and literal characters
pub fn glob_match(pattern: &str, text: &str) -> bool {
    fn matches(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => matches(&p[1..], t) || (!t.is_empty() && matches(p, &t[1..])),
            (Some('?'), Some(_)) => matches(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc == tc => matches(&p[1..], &t[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    matches(&p, &t)
}

#[async_trait]
impl KeyspaceSession for MemorySession {
    async fn ping(&self) -> Result<(), ClientError> {
        self.with_inner(|_| ())
    }

    /// The cursor is an offset into insertion order; each step visits `count` slots
    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        count: u32,
    ) -> Result<(String, Vec<String>), ClientError> {
        let offset: usize = cursor
            .parse()
            .map_err(|_| ClientError::new(ClientErrorKind::Command, "ERR invalid cursor"))?;
        self.with_inner(|inner| {
            let end = (offset + count as usize).min(inner.entries.len());
            let keys = inner.entries[offset.min(end)..end]
                .iter()
                .filter(|(name, _)| glob_match(pattern, name))
                .map(|(name, _)| name.clone())
                .collect();
            let next = if end >= inner.entries.len() { 0 } else { end };
            (next.to_string(), keys)
        })
    }

    async fn key_type(&self, key: &str) -> Result<KeyType, ClientError> {
        self.with_inner(|inner| {
            inner
                .entry(key)
                .map(|entry| entry.value.key_type())
                .unwrap_or(KeyType::None)
        })
    }

    async fn ttl(&self, key: &str) -> Result<i64, ClientError> {
        self.with_inner(|inner| match inner.entry(key) {
            Some(entry) => entry.ttl.unwrap_or(-1),
            None => -2,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.read(key, |value| match value {
            MemoryValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    async fn hash_entries(&self, key: &str) -> Result<Vec<(String, String)>, ClientError> {
        let entries = self.read(key, |value| match value {
            MemoryValue::Hash(entries) => Some(entries.clone()),
            _ => None,
        })?;
        Ok(entries.unwrap_or_default())
    }

    async fn list_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, ClientError> {
        let items = self.read(key, |value| match value {
            MemoryValue::List(items) => Some(slice_range(items, start, stop)),
            _ => None,
        })?;
        Ok(items.unwrap_or_default())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ClientError> {
        let members = self.read(key, |value| match value {
            MemoryValue::Set(members) => Some(members.clone()),
            _ => None,
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn zset_range(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, String)>, ClientError> {
        let entries = self.read(key, |value| match value {
            MemoryValue::Zset(entries) => Some(slice_range(entries, start, stop)),
            _ => None,
        })?;
        Ok(entries.unwrap_or_default())
    }

    async fn stream_range(
        &self,
        key: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, ClientError> {
        let entries = self.read(key, |value| match value {
            MemoryValue::Stream(entries) => Some(entries.iter().take(count).cloned().collect()),
            _ => None,
        })?;
        Ok(entries.unwrap_or_default())
    }

    /// SET overwrites any type and clears the expiry, like Redis
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.with_inner(|inner| {
            let entry = MemoryEntry {
                value: MemoryValue::String(value.to_string()),
                ttl: None,
            };
            match inner.entry_mut(key) {
                Some(existing) => *existing = entry,
                None => inner.entries.push((key.to_string(), entry)),
            }
        })
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool, ClientError> {
        self.with_inner(|inner| match inner.entry_mut(key) {
            Some(entry) => {
                entry.ttl = Some(seconds);
                true
            }
            None => false,
        })
    }

    async fn persist(&self, key: &str) -> Result<bool, ClientError> {
        self.with_inner(|inner| match inner.entry_mut(key) {
            Some(entry) => entry.ttl.take().is_some(),
            None => false,
        })
    }

    async fn delete(&self, key: &str) -> Result<bool, ClientError> {
        self.with_inner(|inner| {
            let before = inner.entries.len();
            inner.entries.retain(|(name, _)| name != key);
            inner.entries.len() != before
        })
    }

    async fn disconnect(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("user:*", "user:1"));
        assert!(glob_match("*", ""));
        assert!(glob_match("user:?", "user:9"));
        assert!(!glob_match("user:?", "user:10"));
        assert!(!glob_match("order:*", "user:1"));
    }

    #[test]
    fn test_slice_range_matches_lrange() {
        let items: Vec<i32> = (0..5).collect();
        assert_eq!(slice_range(&items, 0, 200), items);
        assert_eq!(slice_range(&items, 1, 2), vec![1, 2]);
        assert_eq!(slice_range(&items, 0, -1), items);
        assert!(slice_range(&Vec::<i32>::new(), 0, 200).is_empty());
    }
}
