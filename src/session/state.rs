use std::fmt;

/// Lifecycle of one client connection.
///
/// `Connecting -> Authorizing -> Open -> Closing -> Closed`, or
/// `Authorizing -> Rejected` when the connect is denied. A session stays in
/// `Authorizing` after an allowed connect until its subscriber is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authorizing,
    Open,
    Closing,
    Closed,
    Rejected,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Rejected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Authorizing => "authorizing",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
