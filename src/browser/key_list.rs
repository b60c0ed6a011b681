// ABOUTME: Paginated key list state
// ABOUTME: Search replaces the list, load-more appends, a connection switch resets it

use crate::models::{KeyInfo, ScanPage, START_CURSOR};
use crate::FormData;

use super::{settle, RequestTicket, TicketCounter};

/// Page size sent with every scan the list issues
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Next page replaces the list
    Search,
    /// Next page is appended
    LoadMore,
}

/// A scan the caller should run with `scan_keys`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub ticket: RequestTicket,
    pub cursor: String,
    pub pattern: String,
    pub count: u32,
}

impl ScanRequest {
    pub fn to_form(&self) -> FormData {
        FormData::new()
            .with("cursor", self.cursor.as_str())
            .with("pattern", self.pattern.as_str())
            .with("count", self.count.to_string())
    }
}

#[derive(Debug)]
pub struct KeyListState {
    context: Option<String>,
    tickets: TicketCounter,
    pending: Option<RequestTicket>,
    pattern: String,
    cursor: String,
    mode: ScanMode,
    items: Vec<KeyInfo>,
    done: bool,
    error: Option<String>,
}

impl KeyListState {
    pub fn new(context: Option<String>) -> Self {
        Self {
            context,
            tickets: TicketCounter::default(),
            pending: None,
            pattern: "*".to_string(),
            cursor: START_CURSOR.to_string(),
            mode: ScanMode::Search,
            items: Vec::new(),
            done: true,
            error: None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Edit the pattern field without searching
    pub fn set_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = pattern.into();
    }

    pub fn items(&self) -> &[KeyInfo] {
        &self.items
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Initial scan when the list is first shown
    pub fn mount(&mut self) -> ScanRequest {
        let pattern = self.pattern.clone();
        self.search(pattern)
    }

    /// Start over from the first page with `pattern`
    pub fn search(&mut self, pattern: impl Into<String>) -> ScanRequest {
        self.pattern = pattern.into();
        self.mode = ScanMode::Search;
        self.cursor = START_CURSOR.to_string();
        self.issue()
    }

    pub fn can_load_more(&self) -> bool {
        !self.done && self.context.is_some() && self.pending.is_none()
    }

    /// Continue from the current cursor, or None when there is nothing to load
    pub fn load_more(&mut self) -> Option<ScanRequest> {
        if !self.can_load_more() {
            return None;
        }
        self.mode = ScanMode::LoadMore;
        Some(self.issue())
    }

    fn issue(&mut self) -> ScanRequest {
        let ticket = self.tickets.issue();
        self.pending = Some(ticket);
        ScanRequest {
            ticket,
            cursor: self.cursor.clone(),
            pattern: self.pattern.clone(),
            count: PAGE_SIZE,
        }
    }

    /// Apply a scan result. Returns false, leaving the list untouched, when
    /// the page answers a superseded request or a previous connection.
    pub fn apply(&mut self, ticket: RequestTicket, page: &ScanPage) -> bool {
        if !settle(&mut self.pending, ticket) {
            log::debug!(
                "Dropping stale scan page (generation {}, current {})",
                ticket.generation,
                self.tickets.generation()
            );
            return false;
        }

        match self.mode {
            ScanMode::Search => self.items = page.items.clone(),
            ScanMode::LoadMore => self.items.extend(page.items.iter().cloned()),
        }
        self.cursor = page.cursor.clone();
        self.done = page.done;
        self.error = page.error.clone();
        true
    }

    /// Switch to another active connection. Compared by id only; returns
    /// whether anything was reset.
    pub fn set_context(&mut self, context: Option<&str>) -> bool {
        if self.context.as_deref() == context {
            return false;
        }

        self.context = context.map(str::to_string);
        self.tickets.next_generation();
        self.pending = None;
        self.items.clear();
        self.cursor = START_CURSOR.to_string();
        self.mode = ScanMode::Search;
        self.done = true;
        self.error = None;
        true
    }
}
