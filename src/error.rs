use thiserror::Error;

use crate::schemas::{Money, UserNick};

/// Failures surfaced by the expense core.
///
/// Structured codes only; turning them into user-facing text is the web
/// client's responsibility.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("expense {expense}: {violation}")]
    InvalidExpense {
        expense: String,
        violation: ExpenseViolation,
    },
    #[error("expense {expense} references {nick}, who is not in the group")]
    UnknownMember { expense: String, nick: UserNick },
    /// The balances handed to the planner do not sum to zero. The ledger
    /// never produces such a map, so this marks a bug in the caller.
    #[error("sum of balances must be zero (found {0} minor units)")]
    UnbalancedInput(Money),
}

impl LedgerError {
    /// Stable machine-readable code for the service boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidExpense { .. } => "invalid_expense",
            Self::UnknownMember { .. } => "unknown_member",
            Self::UnbalancedInput(_) => "unbalanced_input",
        }
    }
}

/// The rule an expense broke at construction.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ExpenseViolation {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("amount exceeds the supported maximum")]
    AmountAboveLimit,
    #[error("participant list is empty")]
    NoParticipants,
    #[error("participant list contains duplicates")]
    DuplicateParticipant,
}
