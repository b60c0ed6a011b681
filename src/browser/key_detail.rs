// ABOUTME: Detail panel state for the selected key
// ABOUTME: Fetch on select, editable drafts, update/delete toasts and the copied flag

use std::time::{Duration, Instant};

use crate::models::{KeyDetail, KeyType, KeyUpdateResult};
use crate::FormData;

use super::{settle, Clipboard, Notifier, RequestTicket, TicketCounter};

/// How long the copy button shows "Copied"
pub const COPIED_FOR: Duration = Duration::from_millis(1500);

/// A key action the caller should run: `fetch_key_detail`,
/// `update_string_key` or `delete_key` depending on where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    pub ticket: RequestTicket,
    pub form: FormData,
}

#[derive(Debug)]
pub struct KeyDetailState {
    selected: Option<String>,
    detail: KeyDetail,
    draft_value: String,
    draft_ttl: String,
    copied_at: Option<Instant>,
    tickets: TicketCounter,
    pending_fetch: Option<RequestTicket>,
    pending_update: Option<RequestTicket>,
    pending_delete: Option<RequestTicket>,
}

impl Default for KeyDetailState {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDetailState {
    pub fn new() -> Self {
        Self {
            selected: None,
            detail: KeyDetail::pending(),
            draft_value: String::new(),
            draft_ttl: String::new(),
            copied_at: None,
            tickets: TicketCounter::default(),
            pending_fetch: None,
            pending_update: None,
            pending_delete: None,
        }
    }

    pub fn detail(&self) -> &KeyDetail {
        &self.detail
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn draft_value(&self) -> &str {
        &self.draft_value
    }

    pub fn draft_ttl(&self) -> &str {
        &self.draft_ttl
    }

    pub fn set_draft_value(&mut self, value: impl Into<String>) {
        self.draft_value = value.into();
    }

    pub fn set_draft_ttl(&mut self, ttl: impl Into<String>) {
        self.draft_ttl = ttl.into();
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetch.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.pending_update.is_some()
    }

    pub fn is_deleting(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Only loaded string keys can be edited in place
    pub fn can_edit_string(&self) -> bool {
        self.detail.ok && self.detail.key_type == Some(KeyType::String)
    }

    fn key_request(&mut self, form: FormData) -> KeyRequest {
        KeyRequest {
            ticket: self.tickets.issue(),
            form,
        }
    }

    fn fetch(&mut self, key: &str) -> KeyRequest {
        let request = self.key_request(FormData::new().with("key", key));
        self.pending_fetch = Some(request.ticket);
        request
    }

    /// Change the selected key. A new selection fetches its detail.
    pub fn select(&mut self, key: Option<&str>) -> Option<KeyRequest> {
        if self.selected.as_deref() == key {
            return None;
        }
        self.selected = key.map(str::to_string);
        match key {
            Some(key) => Some(self.fetch(key)),
            None => {
                self.pending_fetch = None;
                None
            }
        }
    }

    /// Fetch the selected key again
    pub fn retry(&mut self) -> Option<KeyRequest> {
        let key = self.selected.clone()?;
        Some(self.fetch(&key))
    }

    /// Replace the shown detail. Drafts are re-seeded from every successful fetch;
    /// a key without expiry seeds a blank TTL, which keeps it that way on update.
    pub fn apply_detail(&mut self, ticket: RequestTicket, detail: KeyDetail) -> bool {
        if !settle(&mut self.pending_fetch, ticket) {
            log::debug!("Dropping stale detail for {:?}", detail.key);
            return false;
        }

        if detail.ok {
            self.draft_value = detail.value_text.clone().unwrap_or_default();
            self.draft_ttl = detail
                .ttl
                .filter(|ttl| *ttl > 0)
                .map(|ttl| ttl.to_string())
                .unwrap_or_default();
        }
        self.detail = detail;
        true
    }

    /// Submit the drafts for the shown key
    pub fn update(&mut self) -> Option<KeyRequest> {
        if !self.can_edit_string() || self.pending_update.is_some() {
            return None;
        }
        let form = FormData::new()
            .with("key", self.detail.key.as_str())
            .with("value", self.draft_value.as_str())
            .with("ttl", self.draft_ttl.as_str());
        let request = self.key_request(form);
        self.pending_update = Some(request.ticket);
        Some(request)
    }

    pub fn apply_update(
        &mut self,
        ticket: RequestTicket,
        result: &KeyUpdateResult,
        notifier: &dyn Notifier,
    ) -> bool {
        if !settle(&mut self.pending_update, ticket) {
            return false;
        }

        if result.ok && !result.key.is_empty() {
            notifier.success("Key updated.");
        } else if let Some(error) = result.error.as_deref().filter(|_| !result.ok) {
            notifier.error(error);
        }
        true
    }

    /// Delete the key currently shown
    pub fn delete(&mut self) -> Option<KeyRequest> {
        if self.detail.key.is_empty() || self.pending_delete.is_some() {
            return None;
        }
        let request = self.key_request(FormData::new().with("key", self.detail.key.as_str()));
        self.pending_delete = Some(request.ticket);
        Some(request)
    }

    pub fn apply_delete(
        &mut self,
        ticket: RequestTicket,
        result: &KeyUpdateResult,
        notifier: &dyn Notifier,
    ) -> bool {
        if !settle(&mut self.pending_delete, ticket) {
            return false;
        }

        if result.ok && !result.key.is_empty() {
            notifier.success("Key deleted.");
            self.draft_value.clear();
            self.draft_ttl.clear();
        } else if let Some(error) = result.error.as_deref().filter(|_| !result.ok) {
            notifier.error(error);
        }
        true
    }

    /// Copy the formatted value. Returns whether anything was copied.
    pub fn copy(&mut self, clipboard: &dyn Clipboard, now: Instant) -> bool {
        let Some(text) = self.detail.value_text.as_deref().filter(|t| !t.is_empty()) else {
            return false;
        };
        match clipboard.write_text(text) {
            Ok(()) => {
                self.copied_at = Some(now);
                true
            }
            Err(e) => {
                log::warn!("Copy to clipboard failed: {}", e);
                false
            }
        }
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < COPIED_FOR)
    }

    /// Forget everything about the previous connection
    pub fn reset(&mut self) {
        self.tickets.next_generation();
        *self = Self {
            tickets: std::mem::take(&mut self.tickets),
            ..Self::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{MemoryClipboard, RecordingNotifier, Toast};
    use crate::models::KeyValue;

    fn loaded(key: &str, value: &str, ttl: i64) -> KeyDetail {
        KeyDetail::loaded(key, KeyType::String, ttl, &KeyValue::String(value.to_string()))
    }

    fn selected(key: &str, value: &str, ttl: i64) -> KeyDetailState {
        let mut state = KeyDetailState::new();
        let request = state.select(Some(key)).unwrap();
        assert!(state.apply_detail(request.ticket, loaded(key, value, ttl)));
        state
    }

    #[test]
    fn test_initial_detail_is_empty_not_failed() {
        let state = KeyDetailState::new();
        assert!(!state.detail().ok);
        assert_eq!(state.detail().key, "");
        assert_eq!(state.detail().error, None);
        assert!(!state.can_edit_string());
    }

    #[test]
    fn test_select_fetches_once_per_key() {
        let mut state = KeyDetailState::new();
        let request = state.select(Some("user:1")).unwrap();
        assert_eq!(request.form.get("key"), Some("user:1"));
        assert!(state.is_loading());
        assert!(state.select(Some("user:1")).is_none());
        assert!(state.select(None).is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_detail_seeds_drafts() {
        let mut state = selected("user:1", "Ada", 30);
        assert_eq!(state.draft_value(), "Ada");
        assert_eq!(state.draft_ttl(), "30");
        assert!(state.can_edit_string());

        state.set_draft_value("Grace");
        let request = state.retry().unwrap();
        state.apply_detail(request.ticket, loaded("user:1", "Ada", -1));
        assert_eq!(state.draft_value(), "Ada");
        assert_eq!(state.draft_ttl(), "");
    }

    #[test]
    fn test_failed_fetch_keeps_drafts() {
        let mut state = selected("user:1", "Ada", 30);
        let request = state.retry().unwrap();
        state.apply_detail(request.ticket, KeyDetail::failure("user:1", "Key not found", false));
        assert_eq!(state.draft_value(), "Ada");
        assert!(!state.can_edit_string());
    }

    #[test]
    fn test_late_detail_for_previous_key_is_dropped() {
        let mut state = KeyDetailState::new();
        let first = state.select(Some("a")).unwrap();
        let second = state.select(Some("b")).unwrap();

        assert!(!state.apply_detail(first.ticket, loaded("a", "1", -1)));
        assert!(state.apply_detail(second.ticket, loaded("b", "2", -1)));
        assert_eq!(state.detail().key, "b");
    }

    #[test]
    fn test_retry_requires_selection() {
        let mut state = KeyDetailState::new();
        assert!(state.retry().is_none());
    }

    #[test]
    fn test_update_sends_drafts_and_notifies() {
        let notifier = RecordingNotifier::default();
        let mut state = selected("user:1", "Ada", 30);
        state.set_draft_value("Grace");
        state.set_draft_ttl("0");

        let request = state.update().unwrap();
        assert_eq!(request.form.get("key"), Some("user:1"));
        assert_eq!(request.form.get("value"), Some("Grace"));
        assert_eq!(request.form.get("ttl"), Some("0"));
        assert!(state.update().is_none());

        state.apply_update(request.ticket, &KeyUpdateResult::success("user:1"), &notifier);
        let request = state.update().unwrap();
        state.apply_update(
            request.ticket,
            &KeyUpdateResult::failure("user:1", "TTL must be >= 0", false),
            &notifier,
        );

        assert_eq!(
            notifier.toasts(),
            vec![
                Toast::Success("Key updated.".into()),
                Toast::Error("TTL must be >= 0".into())
            ]
        );
    }

    #[test]
    fn test_update_refused_for_non_string() {
        let mut state = KeyDetailState::new();
        let request = state.select(Some("profile")).unwrap();
        let hash = KeyValue::Hash(vec![("name".into(), "Ada".into())]);
        state.apply_detail(request.ticket, KeyDetail::loaded("profile", KeyType::Hash, -1, &hash));
        assert!(!state.can_edit_string());
        assert!(state.update().is_none());
        assert!(state.delete().is_some());
    }

    #[test]
    fn test_delete_clears_drafts() {
        let notifier = RecordingNotifier::default();
        let mut state = selected("user:1", "Ada", 30);

        let request = state.delete().unwrap();
        assert_eq!(request.form.get("key"), Some("user:1"));
        state.apply_delete(request.ticket, &KeyUpdateResult::success("user:1"), &notifier);

        assert_eq!(state.draft_value(), "");
        assert_eq!(state.draft_ttl(), "");
        assert_eq!(notifier.toasts(), vec![Toast::Success("Key deleted.".into())]);
    }

    #[test]
    fn test_idle_result_is_silent() {
        let notifier = RecordingNotifier::default();
        let mut state = selected("user:1", "Ada", 30);
        let request = state.delete().unwrap();
        state.apply_delete(request.ticket, &KeyUpdateResult::idle(), &notifier);
        assert!(notifier.toasts().is_empty());
    }

    #[test]
    fn test_copied_flag_expires() {
        let clipboard = MemoryClipboard::default();
        let mut state = selected("user:1", "Ada", 30);
        let now = Instant::now();

        assert!(state.copy(&clipboard, now));
        assert_eq!(clipboard.text.borrow().as_deref(), Some("Ada"));
        assert!(state.is_copied(now + Duration::from_millis(1499)));
        assert!(!state.is_copied(now + Duration::from_millis(1500)));
    }

    #[test]
    fn test_copy_needs_text_and_working_clipboard() {
        let now = Instant::now();
        let mut empty = KeyDetailState::new();
        assert!(!empty.copy(&MemoryClipboard::default(), now));

        let broken = MemoryClipboard {
            broken: true,
            ..Default::default()
        };
        let mut state = selected("user:1", "Ada", 30);
        assert!(!state.copy(&broken, now));
        assert!(!state.is_copied(now));
    }

    #[test]
    fn test_reset_drops_pending_work() {
        let notifier = RecordingNotifier::default();
        let mut state = selected("user:1", "Ada", 30);
        let update = state.update().unwrap();
        let fetch = state.retry().unwrap();

        state.reset();
        assert_eq!(state.selected(), None);
        assert_eq!(state.draft_value(), "");
        assert!(!state.apply_detail(fetch.ticket, loaded("user:1", "Ada", 30)));
        assert!(!state.apply_update(update.ticket, &KeyUpdateResult::success("user:1"), &notifier));
        assert!(notifier.toasts().is_empty());

        let fresh = state.select(Some("user:1")).unwrap();
        assert_ne!(fresh.ticket, fetch.ticket);
    }
}
