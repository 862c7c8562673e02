/// URL status definitions for the frontier
///
/// Every URL in the frontier is in exactly one of these states.
use std::fmt;

/// Represents where a URL is in its crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    /// Waiting to be handed to a worker
    Pending,

    /// Handed to exactly one worker, not yet completed
    Reserved,

    /// Extraction finished (successfully or not); never handed out again
    Done,
}

impl UrlStatus {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the URL still has work attached to it
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Reserved)
    }

    /// Returns true if the transition to `next` is allowed
    ///
    /// The only legal moves are Pending -> Reserved -> Done, plus the
    /// Reserved -> Pending reset performed when a crashed run is resumed.
    pub fn can_transition_to(&self, next: UrlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Reserved)
                | (Self::Pending, Self::Done)
                | (Self::Reserved, Self::Done)
                | (Self::Reserved, Self::Pending)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reserved => "reserved",
            Self::Done => "done",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "reserved" => Some(Self::Reserved),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
