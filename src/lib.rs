// ABOUTME: Main library for the Redis Console backend
// ABOUTME: Contains module declarations, the shared action result and logging setup

use serde::{Deserialize, Serialize};

// Module declarations
pub mod browser;
pub mod commands;
pub mod config;
pub mod db;
pub mod form;
pub mod highlight;
pub mod models;
pub mod state;

pub use config::{ConnectionStore, ConnectionsState, ConsoleConfig};
pub use form::FormData;
pub use state::Console;

/// Result of a connection action (add, rename, test, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            latency_ms: None,
        }
    }

    pub fn success_with_latency(latency_ms: u64) -> Self {
        Self {
            latency_ms: Some(latency_ms),
            ..Self::success()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            latency_ms: None,
        }
    }
}

/// Install the `env_logger` backend for the `log` facade.
///
/// Honors `RUST_LOG` and falls back to `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
