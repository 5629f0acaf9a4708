//! Approve/reject shape shared by deal access requests and mandate interests.
//!
//! Both flows start `PENDING`, are decided exactly once by the listing's
//! owner, and end in an accepted or declined state.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Decline,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Decline => f.write_str("decline"),
        }
    }
}

/// An action attempted from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} while {state}")]
pub struct TransitionError {
    pub action: String,
    pub state: String,
}

impl TransitionError {
    pub fn new(action: impl fmt::Display, state: impl fmt::Debug) -> Self {
        Self {
            action: action.to_string(),
            state: format!("{state:?}").to_uppercase(),
        }
    }

    /// For states with their own display label.
    pub fn labelled(action: impl fmt::Display, state: impl fmt::Display) -> Self {
        Self {
            action: action.to_string(),
            state: state.to_string(),
        }
    }
}

pub trait InterestStatus: Copy + Eq + fmt::Debug {
    const PENDING: Self;
    const ACCEPTED: Self;
    const DECLINED: Self;

    fn is_pending(self) -> bool {
        self == Self::PENDING
    }

    fn is_terminal(self) -> bool {
        self == Self::ACCEPTED || self == Self::DECLINED
    }

    /// Next state for `decision`. Only a pending interest can be decided.
    fn decide(self, decision: Decision) -> Result<Self, TransitionError> {
        if !self.is_pending() {
            return Err(TransitionError::new(decision, self));
        }
        Ok(match decision {
            Decision::Accept => Self::ACCEPTED,
            Decision::Decline => Self::DECLINED,
        })
    }
}
