// ABOUTME: Client-side state for saved connection cards and the connection-lost prompt
// ABOUTME: Name and database drafts, in-flight connection tests, last-tested formatting

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::commands;
use crate::config::{ConnectionRecord, ConnectionsState};
use crate::db::Connector;
use crate::models::View;
use crate::{ActionResult, Console, FormData};

use super::Notifier;

/// Editable state of one connection card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCardState {
    id: String,
    stored_name: String,
    name: String,
    selected_db: u8,
    seen_active: Option<u8>,
}

impl ConnectionCardState {
    pub fn new(record: &ConnectionRecord, state: &ConnectionsState) -> Self {
        let mut card = Self {
            id: record.id.clone(),
            stored_name: record.name.clone(),
            name: record.name.clone(),
            selected_db: state.active_db,
            seen_active: None,
        };
        card.sync(record, state);
        card
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn selected_db(&self) -> u8 {
        self.selected_db
    }

    pub fn is_active(&self) -> bool {
        self.seen_active.is_some()
    }

    /// Follow a freshly loaded state. The name draft is replaced only when
    /// the stored name changed; the database mirrors `activeDb` only while
    /// this card is the active one.
    pub fn sync(&mut self, record: &ConnectionRecord, state: &ConnectionsState) {
        if record.name != self.stored_name {
            self.stored_name = record.name.clone();
            self.name = record.name.clone();
        }

        let active = state.is_active(&record.id).then_some(state.active_db);
        if active != self.seen_active {
            if let Some(db) = active {
                self.selected_db = db;
            }
            self.seen_active = active;
        }
    }

    /// Fields for `rename_connection`
    pub fn rename_form(&self) -> FormData {
        FormData::new()
            .with("id", self.id.as_str())
            .with("name", self.name.as_str())
    }

    /// Pick a database. The choice is submitted right away, so this returns
    /// the fields for `set_active_database`.
    pub fn select_db(&mut self, db: u8) -> FormData {
        self.selected_db = db;
        FormData::new()
            .with("id", self.id.as_str())
            .with("db", db.to_string())
    }
}

/// Tracks which saved connection is being tested
#[derive(Debug, Default)]
pub struct ConnectionTestTracker {
    pending: Option<String>,
}

impl ConnectionTestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_id(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_testing(&self, id: &str) -> bool {
        self.pending.as_deref() == Some(id)
    }

    /// Mark `id` as under test and return the fields for `test_connection`
    pub fn begin(&mut self, id: &str) -> FormData {
        self.pending = Some(id.to_string());
        FormData::new().with("id", id)
    }

    pub fn finish(&mut self, result: &ActionResult, notifier: &dyn Notifier) {
        if !result.ok {
            notifier.error("Connection is closed.");
        }
        self.pending = None;
    }

    /// Run a connection test end to end
    pub async fn run<C: Connector>(
        &mut self,
        console: &Console<C>,
        id: &str,
        notifier: &dyn Notifier,
    ) -> ActionResult {
        let form = self.begin(id);
        let result = commands::test_connection(console, &form).await;
        self.finish(&result, notifier);
        result
    }
}

/// Blocking prompt shown when the server went away mid-browse
#[derive(Debug, Default)]
pub struct ConnectionLostPrompt {
    message: Option<String>,
}

impl ConnectionLostPrompt {
    pub fn is_open(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Open the prompt. While open, later failures keep the first message.
    pub fn raise(&mut self, message: &str) {
        if self.message.is_none() {
            log::warn!("Connection lost: {}", message);
            self.message = Some(message.to_string());
        }
    }

    /// "Back" closes the prompt and returns to the connections screen
    pub fn acknowledge(&mut self) -> View {
        self.message = None;
        View::Connections
    }
}

/// When a connection was last tested, in local time
pub fn format_tested_at(tested_at: Option<&DateTime<Utc>>) -> String {
    format_in(tested_at, &Local)
}

fn format_in<Tz>(tested_at: Option<&DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tested_at {
        Some(at) => at
            .with_timezone(tz)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string(),
        None => "never tested".to_string(),
    }
}
