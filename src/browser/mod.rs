// ABOUTME: Client-side state for the key browser and connection cards
// ABOUTME: Pure state transitions that emit field bags for the action layer to run

pub mod connections;
pub mod key_detail;
pub mod key_list;
pub mod selection;
pub mod session;

pub use connections::{format_tested_at, ConnectionCardState, ConnectionLostPrompt, ConnectionTestTracker};
pub use key_detail::{KeyDetailState, KeyRequest};
pub use key_list::{KeyListState, ScanMode, ScanRequest, PAGE_SIZE};
pub use selection::BrowserSelection;
pub use session::BrowserSession;

/// Sink for user-facing toast messages
pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// System clipboard
pub trait Clipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// Identifies one issued request. A response is applied only when it carries
/// the ticket of the latest request issued in the current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    pub generation: u64,
    pub sequence: u64,
}

/// Issues tickets; bumping the generation invalidates everything issued before
#[derive(Debug, Default)]
pub(crate) struct TicketCounter {
    generation: u64,
    sequence: u64,
}

impl TicketCounter {
    pub(crate) fn issue(&mut self) -> RequestTicket {
        self.sequence += 1;
        RequestTicket {
            generation: self.generation,
            sequence: self.sequence,
        }
    }

    pub(crate) fn next_generation(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

/// Take the pending ticket if `ticket` is it
pub(crate) fn settle(pending: &mut Option<RequestTicket>, ticket: RequestTicket) -> bool {
    if *pending == Some(ticket) {
        *pending = None;
        true
    } else {
        false
    }
}
