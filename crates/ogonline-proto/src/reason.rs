use strum::FromRepr;

/// Why a connection was closed.
///
/// Codes below 2000 are ordinary shutdowns; everything from 2000 upward is an
/// application-level refusal and gets surfaced to the user.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
pub enum ConnectionClosedReason {
    Unspecified = 1000,
    Disconnected = 1001,

    BadRequest = 2000,
    LobbyFull = 2001,
    LobbyPrivate = 2002,
    ClientBanned = 2003,
    HostStoppedHosting = 2004,
    MissingFiles = 2005,
    EditorForbidden = 2006,
    ClientOutdated = 2007,
    ServerOutdated = 2008,
    ModMismatch = 2009,
}

impl ConnectionClosedReason {
    const UNUSUAL_START: u32 = 2000;

    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Unknown codes map to [`ConnectionClosedReason::Unspecified`].
    pub fn from_code(code: u32) -> Self {
        Self::from_repr(code).unwrap_or(Self::Unspecified)
    }

    pub const fn is_unusual(self) -> bool {
        self.code() >= Self::UNUSUAL_START
    }

    /// Human readable text shown when the connection ends.
    pub const fn error_message(self) -> &'static str {
        match self {
            Self::Unspecified => "Connection closed.",
            Self::Disconnected => "Disconnected.",
            Self::BadRequest => "The peer sent a request that was not allowed.",
            Self::LobbyFull => "The lobby is full.",
            Self::LobbyPrivate => "The lobby is private.",
            Self::ClientBanned => "You are banned from this lobby.",
            Self::HostStoppedHosting => "The host stopped hosting.",
            Self::MissingFiles => "You are missing files required by the host.",
            Self::EditorForbidden => "The host does not allow the editor.",
            Self::ClientOutdated => "Your build is older than the host's build.",
            Self::ServerOutdated => "The host's build is older than yours.",
            Self::ModMismatch => "Your active mods do not match the host's mods.",
        }
    }
}

impl std::fmt::Display for ConnectionClosedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionClosedReason as Reason;

    #[test]
    fn unusual_split_at_2000() {
        assert!(!Reason::Unspecified.is_unusual());
        assert!(!Reason::Disconnected.is_unusual());
        assert!(Reason::BadRequest.is_unusual());
        assert!(Reason::LobbyFull.is_unusual());
        assert!(Reason::ModMismatch.is_unusual());
    }

    #[test]
    fn unknown_codes_become_unspecified() {
        assert_eq!(Reason::from_code(2001), Reason::LobbyFull);
        assert_eq!(Reason::from_code(0), Reason::Unspecified);
        assert_eq!(Reason::from_code(4242), Reason::Unspecified);
    }
}
