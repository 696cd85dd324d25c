use std::collections::BTreeSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExpenseViolation, LedgerError};

pub type UserNick = String;

/// Largest accepted expense amount: one crore rupees, in paise.
pub const MAX_AMOUNT: Money = Money(1_000_000_000);

/// Monetary amount in minor units (paise).
///
/// Kept as an integer so equal-share splitting stays exact; rendering as a
/// decimal currency string is the client's job.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_minor(value: i64) -> Self {
        Self(value)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn signum(self) -> i64 {
        self.0.signum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, value| acc + value)
    }
}

/// One shared cost event: paid in full by `paid_by`, split equal-share among
/// `participants` (which may or may not include the payer). Immutable once
/// recorded; removing it and recomputing is the only edit path.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub title: String,
    pub amount: Money,
    pub paid_by: UserNick,
    pub participants: Vec<UserNick>,
    pub date: DateTime<Utc>,
}

impl Expense {
    pub fn try_new(
        id: String,
        title: String,
        amount: Money,
        paid_by: UserNick,
        participants: Vec<UserNick>,
        date: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let expense = Self {
            id,
            title,
            amount,
            paid_by,
            participants,
            date,
        };
        expense.validate()?;
        Ok(expense)
    }

    /// Checks the construction invariants. Also applied to deserialized
    /// documents, so a malformed stored expense is rejected before it can
    /// reach the ledger.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let violation = if self.amount <= Money::zero() {
            Some(ExpenseViolation::NonPositiveAmount)
        } else if self.amount > MAX_AMOUNT {
            Some(ExpenseViolation::AmountAboveLimit)
        } else if self.participants.is_empty() {
            Some(ExpenseViolation::NoParticipants)
        } else if has_duplicates(&self.participants) {
            Some(ExpenseViolation::DuplicateParticipant)
        } else {
            None
        };

        match violation {
            Some(violation) => Err(LedgerError::InvalidExpense {
                expense: self.id.clone(),
                violation,
            }),
            None => Ok(()),
        }
    }

    /// The payer followed by the participants.
    pub fn referenced_members(&self) -> impl Iterator<Item = &UserNick> {
        std::iter::once(&self.paid_by).chain(self.participants.iter())
    }
}

fn has_duplicates(nicks: &[UserNick]) -> bool {
    let mut seen = BTreeSet::new();
    nicks.iter().any(|nick| !seen.insert(nick.as_str()))
}

/// A named collection of members and the expenses among them. The group owns
/// its expense list; members are referenced by username only.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub members: Vec<UserNick>,
    pub expenses: Vec<Expense>,
}
