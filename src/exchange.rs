use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::balance::BalanceSheet;
use crate::error::LedgerError;
use crate::schemas::{Money, UserNick};

/// A recommended payment from `from` to `to`. Derived fresh on every
/// planning call and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transfer {
    pub from: UserNick,
    pub to: UserNick,
    pub amount: Money,
}

// Heap entries order by remaining magnitude first, then by ascending
// username (via `Reverse`), so every "largest remaining" pop is
// deterministic.
type Outstanding = (Money, Reverse<UserNick>);

/// Plans transfers that bring every balance to exactly zero.
///
/// Greedy matching: each round pairs the creditor and the debtor with the
/// largest remaining magnitude, ties broken by ascending username, and moves
/// the smaller of the two remainders between them. Whoever reaches zero
/// drops out, so at most `creditors + debtors - 1` transfers are emitted.
/// The transfer count is not claimed to be the combinatorial minimum.
///
/// The balances must sum to exactly zero, as anything the ledger produces
/// does; other input is rejected as [`LedgerError::UnbalancedInput`].
pub fn plan_settlement(balances: &BalanceSheet) -> Result<Vec<Transfer>, LedgerError> {
    let total: Money = balances.values().copied().sum();
    if !total.is_zero() {
        return Err(LedgerError::UnbalancedInput(total));
    }

    let mut creditors: BinaryHeap<Outstanding> = BinaryHeap::new();
    let mut debtors: BinaryHeap<Outstanding> = BinaryHeap::new();
    for (nick, balance) in balances {
        match balance.signum() {
            1 => creditors.push((*balance, Reverse(nick.clone()))),
            -1 => debtors.push((balance.abs(), Reverse(nick.clone()))),
            _ => {}
        }
    }

    let mut transfers = Vec::new();
    while let (Some((credit, Reverse(creditor))), Some((debt, Reverse(debtor)))) =
        (creditors.pop(), debtors.pop())
    {
        let amount = credit.min(debt);
        if credit > amount {
            creditors.push((credit - amount, Reverse(creditor.clone())));
        }
        if debt > amount {
            debtors.push((debt - amount, Reverse(debtor.clone())));
        }
        transfers.push(Transfer {
            from: debtor,
            to: creditor,
            amount,
        });
    }

    // Zero-sum input drains both sides in the same round.
    debug_assert!(creditors.is_empty() && debtors.is_empty());
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sheet(entries: &[(&str, i64)]) -> BalanceSheet {
        entries
            .iter()
            .map(|(nick, minor)| ((*nick).to_owned(), Money::from_minor(*minor)))
            .collect()
    }

    fn transfer(from: &str, to: &str, amount: i64) -> Transfer {
        Transfer {
            from: from.to_owned(),
            to: to.to_owned(),
            amount: Money::from_minor(amount),
        }
    }

    // Replays the planned transfers against the original sheet; every
    // balance must land on exactly zero.
    fn assert_transfers_settle(balances: &BalanceSheet, transfers: &[Transfer]) {
        let mut remaining = balances.clone();
        for transfer in transfers {
            *remaining.get_mut(&transfer.from).expect("known debtor") += transfer.amount;
            *remaining.get_mut(&transfer.to).expect("known creditor") -= transfer.amount;
        }
        for (nick, balance) in remaining {
            assert!(balance.is_zero(), "{nick} left with {balance}");
        }
    }

    #[test]
    fn simple_split_settles_with_two_transfers() {
        let balances = sheet(&[("alice", 2000), ("bob", -1000), ("charlie", -1000)]);

        let transfers = plan_settlement(&balances).expect("balanced input");

        assert_eq!(
            transfers,
            vec![
                transfer("bob", "alice", 1000),
                transfer("charlie", "alice", 1000),
            ]
        );
        assert_transfers_settle(&balances, &transfers);
    }

    #[test]
    fn equal_magnitudes_resolve_by_ascending_username() {
        let balances = sheet(&[("dana", -200), ("bob", 100), ("charlie", 100)]);

        let transfers = plan_settlement(&balances).expect("balanced input");

        assert_eq!(
            transfers,
            vec![transfer("dana", "bob", 100), transfer("dana", "charlie", 100)]
        );
    }

    #[test]
    fn largest_magnitudes_are_matched_first() {
        let balances = sheet(&[
            ("alice", 80),
            ("bob", 20),
            ("charlie", -50),
            ("dana", -30),
            ("erin", -20),
        ]);

        let transfers = plan_settlement(&balances).expect("balanced input");

        // alice(80) meets charlie(50) first, then dana, then erin picks up
        // the rest from alice and bob.
        assert_eq!(
            transfers,
            vec![
                transfer("charlie", "alice", 50),
                transfer("dana", "alice", 30),
                transfer("erin", "bob", 20),
            ]
        );
        assert_transfers_settle(&balances, &transfers);
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::all_settled(&[("alice", 0), ("bob", 0)])]
    fn settled_sheets_plan_no_transfers(#[case] entries: &[(&str, i64)]) {
        let transfers = plan_settlement(&sheet(entries)).expect("balanced input");
        assert!(transfers.is_empty());
    }

    #[rstest]
    #[case::surplus(&[("alice", 50), ("bob", -40)], 10)]
    #[case::single_creditor(&[("alice", 50)], 50)]
    #[case::deficit(&[("alice", -1)], -1)]
    fn unbalanced_input_is_rejected(#[case] entries: &[(&str, i64)], #[case] total: i64) {
        let result = plan_settlement(&sheet(entries));
        assert_eq!(result, Err(LedgerError::UnbalancedInput(Money::from_minor(total))));
    }

    #[test]
    fn transfer_count_stays_under_the_party_bound() {
        let balances = sheet(&[
            ("alice", 300),
            ("bob", 200),
            ("charlie", -100),
            ("dana", -150),
            ("erin", -250),
        ]);

        let transfers = plan_settlement(&balances).expect("balanced input");

        // 2 creditors + 3 debtors -> at most 4 transfers.
        assert!(transfers.len() <= 4);
        assert_transfers_settle(&balances, &transfers);
    }

    #[test]
    fn planning_is_deterministic() {
        let balances = sheet(&[
            ("alice", 700),
            ("bob", -700),
            ("charlie", 300),
            ("dana", -300),
            ("erin", 0),
        ]);

        let first = plan_settlement(&balances).expect("balanced input");
        let second = plan_settlement(&balances).expect("balanced input");
        assert_eq!(first, second);
    }
}
