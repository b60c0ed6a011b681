// ABOUTME: Connection-related actions
// ABOUTME: Add, rename, delete, activate and test saved Redis connections

use std::time::Instant;

use chrono::Utc;

use crate::config::{ConnectionPatch, ConnectionRecord, ConnectionsState, StoreError, MAX_DB_INDEX};
use crate::db::{redis::connection_info, Connector, KeyspaceSession};
use crate::models::View;
use crate::{ActionResult, Console, FormData};

/// Current connections state for rendering
pub fn load_connections<C: Connector>(
    console: &Console<C>,
) -> Result<ConnectionsState, StoreError> {
    console.store().load().inspect_err(|e| {
        log::error!("Failed to load connections: {}", e);
    })
}

fn save(console: &Console<impl Connector>, state: &ConnectionsState) -> ActionResult {
    match console.store().save(state) {
        Ok(_) => ActionResult::success(),
        Err(e) => ActionResult::error(format!("Failed to save connections: {}", e)),
    }
}

/// Add a new saved connection
pub async fn add_connection<C: Connector>(console: &Console<C>, form: &FormData) -> ActionResult {
    let name = form.field("name");
    let url = form.field("url");

    if name.is_empty() || url.is_empty() {
        return ActionResult::error("Name and URL are required");
    }
    if let Err(e) = connection_info(&url, 0) {
        log::debug!("Rejected connection URL: {}", e);
        return ActionResult::error("Invalid Redis URL");
    }

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };

    let record = ConnectionRecord::new(name, url);
    log::info!("Adding connection {} ({})", record.name, record.id);
    save(console, &state.with_connection(record))
}

/// Rename a saved connection
pub async fn rename_connection<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> ActionResult {
    let id = form.field("id");
    let name = form.field("name");
    if id.is_empty() || name.is_empty() {
        return ActionResult::error("Name is required");
    }

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };
    if !state.contains(&id) {
        return ActionResult::error("Connection not found");
    }

    log::info!("Renaming connection {} to {}", id, name);
    save(console, &state.patch(&id, &ConnectionPatch::rename(name)))
}

/// Remove a saved connection. A missing id is a no-op.
pub async fn delete_connection<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> ActionResult {
    let id = form.field("id");
    if id.is_empty() {
        return ActionResult::success();
    }

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };

    log::info!("Removing connection {}", id);
    save(console, &state.remove(&id))
}

/// Mark a connection as active
pub async fn set_active_connection<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> ActionResult {
    let id = form.field("id");
    if id.is_empty() {
        return ActionResult::error("Invalid connection");
    }

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };
    if !state.contains(&id) {
        return ActionResult::error("Connection not found");
    }

    let db = state.db_for_activation(&id);
    log::info!("Activating connection {} on db {}", id, db);
    save(console, &state.activate(&id, db))
}

/// Select the logical database, activating the connection if needed
pub async fn set_active_database<C: Connector>(
    console: &Console<C>,
    form: &FormData,
) -> ActionResult {
    let id = form.field("id");
    if id.is_empty() {
        return ActionResult::error("Invalid connection");
    }

    let db = match form.field("db").parse::<u8>() {
        Ok(db) if db <= MAX_DB_INDEX => db,
        _ => {
            return ActionResult::error(format!(
                "Database index must be between 0 and {}",
                MAX_DB_INDEX
            ))
        }
    };

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };
    if !state.contains(&id) {
        return ActionResult::error("Connection not found");
    }

    log::info!("Selecting db {} on connection {}", db, id);
    save(console, &state.activate(&id, db))
}

/// Activate a connection and switch to the key browser.
///
/// Any failure keeps the user on the connections screen.
pub async fn open_browser<C: Connector>(console: &Console<C>, form: &FormData) -> View {
    let result = set_active_connection(console, form).await;
    if result.ok {
        View::Browser
    } else {
        log::debug!(
            "Staying on connections: {}",
            result.error.unwrap_or_default()
        );
        View::Connections
    }
}

/// Ping a saved connection and store the outcome on its record
pub async fn test_connection<C: Connector>(console: &Console<C>, form: &FormData) -> ActionResult {
    let id = form.field("id");
    if id.is_empty() {
        return ActionResult::error("Invalid connection");
    }

    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };
    let target = match state.find(&id) {
        Some(record) => record.clone(),
        None => return ActionResult::error("Connection not found"),
    };

    let started_at = Instant::now();
    let outcome = match console.connector().connect(&target, 0).await {
        Ok(session) => {
            let pinged = session.ping().await;
            session.disconnect().await;
            pinged
        }
        Err(e) => Err(e),
    };
    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (patch, result) = match outcome {
        Ok(()) => {
            log::info!("Connection {} answered in {} ms", target.name, latency_ms);
            (
                ConnectionPatch::test_passed(Utc::now(), latency_ms),
                ActionResult::success_with_latency(latency_ms),
            )
        }
        Err(e) => {
            log::warn!("Connection test for {} failed: {}", target.name, e);
            (
                ConnectionPatch::test_failed(Utc::now(), e.to_string()),
                ActionResult::error(e.to_string()),
            )
        }
    };

    // Re-read so changes made while the ping was in flight are kept
    let state = match console.store().load() {
        Ok(s) => s,
        Err(e) => return ActionResult::error(format!("Failed to load connections: {}", e)),
    };
    let saved = save(console, &state.patch(&id, &patch));
    if !saved.ok {
        return saved;
    }
    result
}
