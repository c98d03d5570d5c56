/// Phase definitions for the crawl state machine
///
/// A crawl moves through these phases once per page and ends in exactly one
/// terminal phase.
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// Inputs are being validated; nothing has been fetched yet
    Init,

    /// A page request is in flight (including retry backoff)
    Fetching,

    /// The page body is being decoded
    Parsing,

    /// Page entries are being mapped and filtered
    Filtering,

    /// Deciding whether another page should be requested
    CheckingTermination,

    /// Remaining buffered reviews are being written out
    Flushing,

    // ===== Terminal Phases =====
    /// Pagination ended naturally and all output was written
    Done,

    /// Stopped on request; buffered output was written
    Cancelled,

    /// Stopped on a fatal error
    Failed,
}

impl CrawlPhase {
    /// Returns true if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }

    /// Returns true if the crawl still owns an open page loop
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the transition `self -> next` is permitted
    ///
    /// Any active phase may fail. Cancellation is observed only between
    /// pages, so only `Init` and `CheckingTermination` lead to `Flushing`.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Self::Init, Self::Fetching)
                | (Self::Init, Self::Flushing)
                | (Self::Fetching, Self::Parsing)
                | (Self::Parsing, Self::Filtering)
                | (Self::Filtering, Self::CheckingTermination)
                | (Self::CheckingTermination, Self::Fetching)
                | (Self::CheckingTermination, Self::Flushing)
                | (Self::Flushing, Self::Done)
                | (Self::Flushing, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Filtering => "filtering",
            Self::CheckingTermination => "checking_termination",
            Self::Flushing => "flushing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Returns all phases in declaration order
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Fetching,
            Self::Parsing,
            Self::Filtering,
            Self::CheckingTermination,
            Self::Flushing,
            Self::Done,
            Self::Cancelled,
            Self::Failed,
        ]
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
