use std::collections::{BTreeMap, BTreeSet};

use crate::error::LedgerError;
use crate::schemas::{Expense, Group, Money, UserNick};

/// Net position per member, keyed by username.
///
/// A `BTreeMap` so iteration runs in ascending username order and repeated
/// computations serialize identically.
pub type BalanceSheet = BTreeMap<UserNick, Money>;

/// Derives each member's net position (`paid - owed`) from a list of
/// expenses.
///
/// Each expense is split equal-share among its participants and credited in
/// full to its payer. Members referenced by no expense are absent from the
/// result; the returned balances always sum to exactly zero.
pub fn compute_balances(expenses: &[Expense]) -> Result<BalanceSheet, LedgerError> {
    let mut balances = BalanceSheet::new();
    for expense in expenses {
        expense.validate()?;
        *balances
            .entry(expense.paid_by.clone())
            .or_insert(Money::zero()) += expense.amount;
        for (nick, share) in equal_shares(expense) {
            *balances.entry(nick.clone()).or_insert(Money::zero()) -= share;
        }
    }
    Ok(balances)
}

/// Same as [`compute_balances`], but checks every referenced member against
/// `roster` and seeds every roster member into the result, so settled
/// members show up with a zero balance.
pub fn compute_balances_for_roster(
    expenses: &[Expense],
    roster: &BTreeSet<UserNick>,
) -> Result<BalanceSheet, LedgerError> {
    for expense in expenses {
        expense.validate()?;
        if let Some(nick) = expense
            .referenced_members()
            .find(|nick| !roster.contains(*nick))
        {
            return Err(LedgerError::UnknownMember {
                expense: expense.id.clone(),
                nick: nick.clone(),
            });
        }
    }

    let mut balances: BalanceSheet = roster
        .iter()
        .map(|nick| (nick.clone(), Money::zero()))
        .collect();
    for (nick, net) in compute_balances(expenses)? {
        balances.insert(nick, net);
    }
    Ok(balances)
}

/// Balance sheet for a whole group, with the group's member list as the
/// authoritative roster.
pub fn compute_balance_from_group(group: &Group) -> Result<BalanceSheet, LedgerError> {
    let roster: BTreeSet<UserNick> = group.members.iter().cloned().collect();
    compute_balances_for_roster(&group.expenses, &roster)
}

// Equal-share split in minor units: everyone gets the floored share, and the
// first `amount % n` participants in username order carry one extra paisa.
// The shares therefore always sum exactly to the expense amount.
fn equal_shares(expense: &Expense) -> Vec<(&UserNick, Money)> {
    let mut participants: Vec<&UserNick> = expense.participants.iter().collect();
    participants.sort_unstable();

    let count = participants.len() as i64;
    let base = expense.amount.minor() / count;
    let remainder = (expense.amount.minor() % count) as usize;

    participants
        .into_iter()
        .enumerate()
        .map(|(idx, nick)| {
            let extra = i64::from(idx < remainder);
            (nick, Money::from_minor(base + extra))
        })
        .collect()
}
