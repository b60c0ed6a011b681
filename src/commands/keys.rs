// ABOUTME: Key browsing actions against the active connection
// ABOUTME: Paginated SCAN, type-dispatched key detail, string updates and deletes

use crate::config::ConnectionRecord;
use crate::db::{Connector, KeyspaceSession};
use crate::models::{
    KeyDetail, KeyInfo, KeyType, KeyUpdateResult, KeyValue, ScanPage, START_CURSOR,
};
use crate::{Console, FormData};

use super::ActionError;

pub const DEFAULT_SCAN_COUNT: u32 = 100;
pub const MIN_SCAN_COUNT: u32 = 10;
pub const MAX_SCAN_COUNT: u32 = 500;

/// Highest index fetched for lists and sorted sets (inclusive, so 201 items)
const RANGE_STOP: isize = 200;
const STREAM_ENTRY_LIMIT: usize = 200;

/// Validated inputs of one scan step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanParams {
    pub cursor: String,
    pub pattern: String,
    pub count: u32,
}

impl ScanParams {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            cursor: form.field_or("cursor", START_CURSOR),
            pattern: form.field_or("pattern", "*"),
            count: clamp_count(&form.field("count")),
        }
    }
}

/// Page size hint: 100 when missing or not a number, then clamped to [10, 500]
pub fn clamp_count(raw: &str) -> u32 {
    let requested = raw
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n != 0.0)
        .unwrap_or(f64::from(DEFAULT_SCAN_COUNT));
    requested.clamp(f64::from(MIN_SCAN_COUNT), f64::from(MAX_SCAN_COUNT)) as u32
}

/// Active record and database, or the reason there is none
fn active_target<C: Connector>(
    console: &Console<C>,
) -> Result<Option<(ConnectionRecord, u8)>, ActionError> {
    let state = console.store().load()?;
    Ok(state.active().cloned().map(|record| (record, state.active_db)))
}

fn require_active_target<C: Connector>(
    console: &Console<C>,
) -> Result<(ConnectionRecord, u8), ActionError> {
    let state = console.store().load()?;
    if state.active_id.is_none() {
        return Err(ActionError::validation("No active connection"));
    }
    match state.active() {
        Some(record) => Ok((record.clone(), state.active_db)),
        None => Err(ActionError::not_found("Active connection not found")),
    }
}

fn require_key(form: &FormData) -> Result<String, ActionError> {
    match form.get("key") {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ActionError::validation("Key is required")),
    }
}

/// Fetch one page of keys with their type and TTL.
///
/// Without an active connection this is an empty, finished page rather than an error.
pub async fn scan_keys<C: Connector>(console: &Console<C>, form: &FormData) -> ScanPage {
    let params = ScanParams::from_form(form);
    log::debug!(
        "Scanning from cursor {} matching {} (count {})",
        params.cursor,
        params.pattern,
        params.count
    );

    match run_scan(console, &params).await {
        Ok(page) => page,
        Err(e) => {
            log::warn!("Key scan failed: {}", e);
            ScanPage::failure(e.to_string(), e.is_connection_lost())
        }
    }
}

async fn run_scan<C: Connector>(
    console: &Console<C>,
    params: &ScanParams,
) -> Result<ScanPage, ActionError> {
    let Some((record, db)) = active_target(console)? else {
        return Ok(ScanPage::empty());
    };

    let session = console.connector().connect(&record, db).await?;
    let page = scan_step(&session, params).await;
    session.disconnect().await;
    Ok(page?)
}

async fn scan_step<S: KeyspaceSession>(
    session: &S,
    params: &ScanParams,
) -> Result<ScanPage, ActionError> {
    let (next_cursor, keys) = session
        .scan(&params.cursor, &params.pattern, params.count)
        .await?;

    let mut items = Vec::with_capacity(keys.len());
    for key in keys {
        let (key_type, ttl) = tokio::try_join!(session.key_type(&key), session.ttl(&key))?;
        items.push(KeyInfo::new(key, key_type, ttl));
    }

    Ok(ScanPage::from_step(next_cursor, items))
}

/// Fetch a key's type, TTL and decoded value
pub async fn fetch_key_detail<C: Connector>(console: &Console<C>, form: &FormData) -> KeyDetail {
    let key = form.get("key").unwrap_or_default().to_string();
    log::debug!("Fetching key {:?}", key);

    match run_fetch(console, form).await {
        Ok(detail) => detail,
        Err(e) => {
            log::warn!("Fetching key {:?} failed: {}", key, e);
            KeyDetail::failure(key, e.to_string(), e.is_connection_lost())
        }
    }
}

async fn run_fetch<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> Result<KeyDetail, ActionError> {
    let key = require_key(form)?;
    let (record, db) = require_active_target(console)?;

    let session = console.connector().connect(&record, db).await?;
    let detail = read_detail(&session, &key).await;
    session.disconnect().await;
    detail
}

async fn read_detail<S: KeyspaceSession>(session: &S, key: &str) -> Result<KeyDetail, ActionError> {
    let key_type = session.key_type(key).await?;
    if key_type == KeyType::None {
        return Err(ActionError::not_found("Key not found"));
    }

    let ttl = session.ttl(key).await?;
    let value = read_value(session, key, &key_type).await?;
    Ok(KeyDetail::loaded(key, key_type, ttl, &value))
}

async fn read_value<S: KeyspaceSession>(
    session: &S,
    key: &str,
    key_type: &KeyType,
) -> Result<KeyValue, ActionError> {
    let value = match key_type {
        KeyType::String => KeyValue::String(session.get(key).await?.unwrap_or_default()),
        KeyType::Hash => KeyValue::Hash(session.hash_entries(key).await?),
        KeyType::List => KeyValue::List(session.list_range(key, 0, RANGE_STOP).await?),
        KeyType::Set => KeyValue::Set(session.set_members(key).await?),
        KeyType::Zset => KeyValue::Zset(session.zset_range(key, 0, RANGE_STOP).await?),
        KeyType::Stream => KeyValue::Stream(session.stream_range(key, STREAM_ENTRY_LIMIT).await?),
        KeyType::None | KeyType::Other(_) => KeyValue::Unsupported,
    };
    Ok(value)
}

/// Requested expiry change for a string update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlChange {
    Keep,
    Persist,
    Expire(i64),
}

/// Parse the `ttl` field: blank keeps the expiry, 0 clears it, N > 0 sets it
pub fn parse_ttl(raw: &str) -> Result<TtlChange, ActionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(TtlChange::Keep);
    }

    let seconds = raw
        .parse::<f64>()
        .ok()
        .filter(|n| {
            n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= i64::MAX as f64
        })
        .ok_or_else(|| ActionError::validation("TTL must be >= 0"))?;

    match seconds as i64 {
        0 => Ok(TtlChange::Persist),
        n => Ok(TtlChange::Expire(n)),
    }
}

/// Overwrite a string key and optionally change its expiry.
///
/// Keys holding any other type are left untouched.
pub async fn update_string_key<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> KeyUpdateResult {
    let key = form.get("key").unwrap_or_default().to_string();

    match run_update(console, form).await {
        Ok(()) => {
            log::info!("Updated key {:?}", key);
            KeyUpdateResult::success(key)
        }
        Err(e) => {
            log::warn!("Updating key {:?} failed: {}", key, e);
            KeyUpdateResult::failure(key, e.to_string(), e.is_connection_lost())
        }
    }
}

async fn run_update<C: Connector>(console: &Console<C>, form: &FormData) -> Result<(), ActionError> {
    let key = require_key(form)?;
    let value = form.get("value").unwrap_or_default().to_string();
    let ttl = parse_ttl(&form.field("ttl"))?;
    let (record, db) = require_active_target(console)?;

    let session = console.connector().connect(&record, db).await?;
    let outcome = write_string(&session, &key, &value, ttl).await;
    session.disconnect().await;
    outcome
}

async fn write_string<S: KeyspaceSession>(
    session: &S,
    key: &str,
    value: &str,
    ttl: TtlChange,
) -> Result<(), ActionError> {
    let key_type = session.key_type(key).await?;
    if !matches!(key_type, KeyType::String | KeyType::None) {
        return Err(ActionError::TypeMismatch(key_type));
    }

    // SET drops any existing expiry, so restore it when the caller asked to keep it
    let remaining = match ttl {
        TtlChange::Keep => session.ttl(key).await?,
        _ => -1,
    };

    session.set(key, value).await?;

    match ttl {
        TtlChange::Keep if remaining > 0 => {
            session.expire(key, remaining).await?;
        }
        TtlChange::Keep => {}
        TtlChange::Persist => {
            session.persist(key).await?;
        }
        TtlChange::Expire(seconds) => {
            session.expire(key, seconds).await?;
        }
    }
    Ok(())
}

/// Delete a key. Deleting a missing key still succeeds.
pub async fn delete_key<C: Connector>(console: &Console<C>, form: &FormData) -> KeyUpdateResult {
    let key = form.get("key").unwrap_or_default().to_string();

    match run_delete(console, form).await {
        Ok(existed) => {
            log::info!("Deleted key {:?} (existed: {})", key, existed);
            KeyUpdateResult::success(key)
        }
        Err(e) => {
            log::warn!("Deleting key {:?} failed: {}", key, e);
            KeyUpdateResult::failure(key, e.to_string(), e.is_connection_lost())
        }
    }
}

async fn run_delete<C: Connector>(console: &Console<C>, form: &FormData) -> Result<bool, ActionError> {
    let key = require_key(form)?;
    let (record, db) = require_active_target(console)?;

    let session = console.connector().connect(&record, db).await?;
    let deleted = session.delete(&key).await;
    session.disconnect().await;
    Ok(deleted?)
}
