// ABOUTME: Configuration and persisted connection state for Redis Console
// ABOUTME: Reads and writes the single connections.json document and its records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "REDIS_CONSOLE_DATA_DIR";

/// Highest logical database index a connection may select
pub const MAX_DB_INDEX: u8 = 15;

const APP_DIR_NAME: &str = "Redis Console";
const DATA_FILE_NAME: &str = "connections.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read connections file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse connections file: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Data directory not found")]
    NoDirFound,
}

/// Outcome of the last connectivity test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Ok,
    Error,
}

/// A saved Redis endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_status: Option<TestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_error: Option<String>,
}

impl ConnectionRecord {
    /// Allocate a record with a fresh id and creation timestamp
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            created_at: Utc::now(),
            last_tested_at: None,
            last_test_status: None,
            last_test_latency_ms: None,
            last_test_error: None,
        }
    }

    fn apply(&mut self, patch: &ConnectionPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(tested_at) = patch.last_tested_at {
            self.last_tested_at = Some(tested_at);
        }
        if let Some(status) = patch.last_test_status {
            self.last_test_status = Some(status);
        }
        if let Some(latency) = patch.last_test_latency_ms {
            self.last_test_latency_ms = Some(latency);
        }
        if let Some(error) = &patch.last_test_error {
            self.last_test_error = error.clone();
        }
    }
}

/// Partial update of a [`ConnectionRecord`]. Unset fields are left untouched.
///
/// `last_test_error` is doubly optional so a patch can clear the stored message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub last_tested_at: Option<DateTime<Utc>>,
    pub last_test_status: Option<TestStatus>,
    pub last_test_latency_ms: Option<u64>,
    pub last_test_error: Option<Option<String>>,
}

impl ConnectionPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Successful ping: records latency and clears any previous error
    pub fn test_passed(tested_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            last_tested_at: Some(tested_at),
            last_test_status: Some(TestStatus::Ok),
            last_test_latency_ms: Some(latency_ms),
            last_test_error: Some(None),
            ..Default::default()
        }
    }

    pub fn test_failed(tested_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            last_tested_at: Some(tested_at),
            last_test_status: Some(TestStatus::Error),
            last_test_error: Some(Some(message.into())),
            ..Default::default()
        }
    }
}

/// The persisted aggregate: saved connections plus the active selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsState {
    #[serde(default)]
    pub active_id: Option<String>,
    #[serde(default)]
    pub active_db: u8,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl ConnectionsState {
    pub fn find(&self, id: &str) -> Option<&ConnectionRecord> {
        self.connections.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// The record `active_id` points at, if any
    pub fn active(&self) -> Option<&ConnectionRecord> {
        self.active_id.as_deref().and_then(|id| self.find(id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active_id.as_deref() == Some(id)
    }

    /// Append a record, keeping insertion order
    pub fn with_connection(mut self, record: ConnectionRecord) -> Self {
        self.connections.push(record);
        self
    }

    /// Replace the listed fields of one record. Unknown ids leave the state unchanged.
    pub fn patch(mut self, id: &str, patch: &ConnectionPatch) -> Self {
        if let Some(record) = self.connections.iter_mut().find(|item| item.id == id) {
            record.apply(patch);
        }
        self
    }

    /// Drop a record; clears the active selection if it pointed at it
    pub fn remove(mut self, id: &str) -> Self {
        if self.is_active(id) {
            self.active_id = None;
            self.active_db = 0;
        }
        self.connections.retain(|item| item.id != id);
        self
    }

    /// Make `id` active with database `db`
    pub fn activate(mut self, id: &str, db: u8) -> Self {
        self.active_id = Some(id.to_string());
        self.active_db = db;
        self
    }

    /// Database to use when activating `id`: kept when it is already active
    pub fn db_for_activation(&self, id: &str) -> u8 {
        if self.is_active(id) {
            self.active_db
        } else {
            0
        }
    }

    /// Repair a hand-edited document so the invariants hold
    fn normalized(mut self) -> Self {
        if self.active_db > MAX_DB_INDEX {
            log::warn!(
                "Stored database index {} out of range, resetting to 0",
                self.active_db
            );
            self.active_db = 0;
        }
        if let Some(id) = self.active_id.clone() {
            if !self.contains(&id) {
                log::warn!("Active connection {} no longer exists, clearing it", id);
                self.active_id = None;
                self.active_db = 0;
            }
        }
        self
    }
}

/// Fixed client policy used for every Redis handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientPolicy {
    pub connect_timeout: Duration,
    /// Issue a PING after connecting, before any command
    pub ready_check: bool,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            ready_check: true,
        }
    }
}

/// Where the console keeps its data and how it talks to Redis
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    /// Explicit connections document path; overrides env and platform lookup
    pub data_file: Option<PathBuf>,
    pub client: ClientPolicy,
}

impl ConsoleConfig {
    pub fn with_data_file(path: impl Into<PathBuf>) -> Self {
        Self {
            data_file: Some(path.into()),
            ..Default::default()
        }
    }

    /// Resolve the connections document path
    pub fn data_file_path(&self) -> Result<PathBuf, StoreError> {
        if let Some(path) = &self.data_file {
            return Ok(path.clone());
        }

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir).join(DATA_FILE_NAME));
        }

        let data_dir = dirs::data_local_dir().ok_or(StoreError::NoDirFound)?;
        Ok(data_dir.join(APP_DIR_NAME).join(DATA_FILE_NAME))
    }
}

/// File-backed store for [`ConnectionsState`].
///
/// Every operation is a whole-document read or write. There is no locking, so
/// two writers racing on the same file lose updates (last write wins).
#[derive(Debug)]
pub struct ConnectionStore {
    path: PathBuf,
    revision: watch::Sender<u64>,
}

impl ConnectionStore {
    pub fn open(config: &ConsoleConfig) -> Result<Self, StoreError> {
        Ok(Self::at(config.data_file_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            path: path.into(),
            revision,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Receives the store revision after every save
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Load the document, creating an empty one on first use
    pub fn load(&self) -> Result<ConnectionsState, StoreError> {
        self.ensure_exists()?;

        let contents = fs::read_to_string(&self.path)?;
        let state: ConnectionsState = serde_json::from_str(&contents)?;
        Ok(state.normalized())
    }

    /// Overwrite the whole document and notify subscribers
    pub fn save(&self, state: &ConnectionsState) -> Result<(), StoreError> {
        self.write(state)?;
        self.revision.send_modify(|revision| *revision += 1);
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        log::info!("Creating connections file at {}", self.path.display());
        self.write(&ConnectionsState::default())
    }

    fn write(&self, state: &ConnectionsState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}
