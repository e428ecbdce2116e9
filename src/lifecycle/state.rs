use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in-progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(TicketStatus::parse("open"), Some(TicketStatus::Open));
        assert_eq!(TicketStatus::parse("in-progress"), Some(TicketStatus::InProgress));
        assert_eq!(TicketStatus::parse("resolved"), Some(TicketStatus::Resolved));
        assert_eq!(TicketStatus::parse("closed"), Some(TicketStatus::Closed));
        assert_eq!(TicketStatus::parse("in_progress"), None);
        assert_eq!(TicketStatus::parse("done"), None);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: TicketStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, TicketStatus::InProgress);
    }

    #[test]
    fn test_only_closed_is_terminal() {
        for status in TicketStatus::ALL {
            assert_eq!(status.is_terminal(), status == TicketStatus::Closed);
        }
    }
}
