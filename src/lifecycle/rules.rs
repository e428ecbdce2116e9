use super::TicketStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionPermission {
    Allowed,
    Denied(String),
}

impl TransitionPermission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionPermission::Allowed)
    }
}

/// The transition table. Every status check in the crate goes through here.
pub fn allowed_successors(from: TicketStatus) -> &'static [TicketStatus] {
    use TicketStatus::*;

    match from {
        Open => &[InProgress],
        InProgress => &[Resolved],
        Resolved => &[Closed],
        Closed => &[],
    }
}

pub fn can_transition(from: TicketStatus, to: TicketStatus) -> TransitionPermission {
    if allowed_successors(from).contains(&to) {
        return TransitionPermission::Allowed;
    }

    TransitionPermission::Denied(format!("Cannot change status from {} to {}", from, to))
}
