// ABOUTME: Key browser session tying the list, selection and detail panel together
// ABOUTME: Routes connection switches and connection-lost results to every part

use crate::models::{KeyDetail, KeyUpdateResult, ScanPage, View};

use super::{
    BrowserSelection, ConnectionLostPrompt, KeyDetailState, KeyListState, KeyRequest, Notifier,
    RequestTicket, ScanRequest,
};

#[derive(Debug)]
pub struct BrowserSession {
    list: KeyListState,
    selection: BrowserSelection,
    detail: KeyDetailState,
    lost: ConnectionLostPrompt,
}

impl BrowserSession {
    /// Session for the connection with id `active_id`, if any
    pub fn new(active_id: Option<String>) -> Self {
        Self {
            list: KeyListState::new(active_id.clone()),
            selection: BrowserSelection::new(active_id),
            detail: KeyDetailState::new(),
            lost: ConnectionLostPrompt::default(),
        }
    }

    pub fn list(&self) -> &KeyListState {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut KeyListState {
        &mut self.list
    }

    pub fn detail(&self) -> &KeyDetailState {
        &self.detail
    }

    pub fn detail_mut(&mut self) -> &mut KeyDetailState {
        &mut self.detail
    }

    pub fn selected_key(&self) -> Option<&str> {
        self.selection.selected()
    }

    pub fn connection_lost(&self) -> &ConnectionLostPrompt {
        &self.lost
    }

    /// Leave the browser after a lost connection
    pub fn acknowledge_connection_lost(&mut self) -> View {
        self.lost.acknowledge()
    }

    pub fn mount(&mut self) -> ScanRequest {
        self.list.mount()
    }

    pub fn search(&mut self, pattern: impl Into<String>) -> ScanRequest {
        self.list.search(pattern)
    }

    pub fn load_more(&mut self) -> Option<ScanRequest> {
        self.list.load_more()
    }

    pub fn apply_scan(&mut self, ticket: RequestTicket, page: &ScanPage) -> bool {
        let applied = self.list.apply(ticket, page);
        if applied && page.connection_lost {
            self.raise_lost(page.error.as_deref());
        }
        applied
    }

    /// Select a key in the list; returns the detail fetch to run
    pub fn select_key(&mut self, key: Option<&str>) -> Option<KeyRequest> {
        if !self.selection.select(key) {
            return None;
        }
        self.detail.select(key)
    }

    pub fn apply_detail(&mut self, ticket: RequestTicket, detail: KeyDetail) -> bool {
        let lost = detail.connection_lost.then(|| detail.error.clone()).flatten();
        let applied = self.detail.apply_detail(ticket, detail);
        if applied {
            self.raise_lost(lost.as_deref());
        }
        applied
    }

    pub fn apply_update(
        &mut self,
        ticket: RequestTicket,
        result: &KeyUpdateResult,
        notifier: &dyn Notifier,
    ) -> bool {
        let applied = self.detail.apply_update(ticket, result, notifier);
        if applied && result.connection_lost {
            self.raise_lost(result.error.as_deref());
        }
        applied
    }

    pub fn apply_delete(
        &mut self,
        ticket: RequestTicket,
        result: &KeyUpdateResult,
        notifier: &dyn Notifier,
    ) -> bool {
        let applied = self.detail.apply_delete(ticket, result, notifier);
        if applied && result.connection_lost {
            self.raise_lost(result.error.as_deref());
        }
        applied
    }

    fn raise_lost(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            self.lost.raise(message);
        }
    }

    /// The active connection changed. Everything tied to the old one is
    /// dropped, including responses still in flight.
    pub fn set_context(&mut self, active_id: Option<&str>) -> bool {
        let changed = self.list.set_context(active_id);
        self.selection.set_context(active_id);
        if changed {
            self.detail.reset();
        }
        changed
    }
}
