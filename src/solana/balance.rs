use crate::solana::models::{
    BalanceChange, RawTransaction, TokenBalanceSnapshot, NATIVE_DECIMALS, NATIVE_SYMBOL,
};
use crate::tokens::SymbolLookup;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::Zero;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::str::FromStr;
use tracing::warn;

/// Compute the non-zero balance changes `owner` saw in one transaction.
///
/// The native entry (if any) comes first, followed by token entries in
/// account-list order. Each owned token account is diffed on its own, so two
/// accounts of the same mint produce two entries.
pub fn compute_changes(
    tx: &RawTransaction,
    owner: &Pubkey,
    owned_token_accounts: &HashSet<String>,
    symbols: &dyn SymbolLookup,
) -> Vec<BalanceChange> {
    let mut changes = Vec::new();

    if let Some(change) = native_change(tx, owner) {
        changes.push(change);
    }

    changes.extend(token_changes(tx, owned_token_accounts, symbols));
    changes
}

/// `post - pre` lamports at the owner's own index, in SOL.
///
/// The fee is already reflected in the snapshots and is not applied again.
pub fn native_change(tx: &RawTransaction, owner: &Pubkey) -> Option<BalanceChange> {
    let owner = owner.to_string();
    let index = tx.account_keys.iter().position(|key| *key == owner)?;

    let (pre, post) = match (tx.pre_balances.get(index), tx.post_balances.get(index)) {
        (Some(pre), Some(post)) => (*pre, *post),
        _ => {
            warn!(
                signature = %tx.signature,
                index = index,
                "Native balance snapshot missing for owner, skipping"
            );
            return None;
        }
    };

    let delta = BigInt::from(post) - BigInt::from(pre);
    if delta.is_zero() {
        return None;
    }

    Some(BalanceChange {
        ticker: Some(NATIVE_SYMBOL.to_string()),
        change_amount: BigDecimal::new(delta, NATIVE_DECIMALS),
    })
}

pub fn token_changes(
    tx: &RawTransaction,
    owned_token_accounts: &HashSet<String>,
    symbols: &dyn SymbolLookup,
) -> Vec<BalanceChange> {
    tx.account_keys
        .iter()
        .enumerate()
        .filter(|(_, key)| owned_token_accounts.contains(key.as_str()))
        .filter_map(|(index, _)| {
            let pre = find_snapshot(&tx.pre_token_balances, index)?;
            let post = find_snapshot(&tx.post_token_balances, index)?;

            let change_amount = token_delta(pre, post).or_else(|| {
                warn!(
                    signature = %tx.signature,
                    index = index,
                    "Unparseable token amount, skipping"
                );
                None
            })?;

            if change_amount.is_zero() {
                return None;
            }

            Some(BalanceChange {
                ticker: symbols.symbol(&post.mint).map(str::to_string),
                change_amount,
            })
        })
        .collect()
}

fn find_snapshot(snapshots: &[TokenBalanceSnapshot], index: usize) -> Option<&TokenBalanceSnapshot> {
    snapshots.iter().find(|snapshot| snapshot.account_index == index)
}

/// `(post - pre) / 10^decimals` on the raw integer strings, exactly.
fn token_delta(pre: &TokenBalanceSnapshot, post: &TokenBalanceSnapshot) -> Option<BigDecimal> {
    let pre_amount = BigInt::from_str(pre.amount.trim()).ok()?;
    let post_amount = BigInt::from_str(post.amount.trim()).ok()?;

    Some(BigDecimal::new(post_amount - pre_amount, i64::from(post.decimals)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenList;

    fn snapshot(index: usize, mint: &str, amount: &str, decimals: u8) -> TokenBalanceSnapshot {
        TokenBalanceSnapshot {
            account_index: index,
            mint: mint.to_string(),
            amount: amount.to_string(),
            decimals,
        }
    }

    fn tx(owner: &Pubkey, keys: &[&str]) -> RawTransaction {
        let mut account_keys = vec![owner.to_string()];
        account_keys.extend(keys.iter().map(|k| k.to_string()));
        let len = account_keys.len();

        RawTransaction {
            signature: "sig".to_string(),
            block_time: Some(1),
            fee: 5_000,
            failed: false,
            account_keys,
            pre_balances: vec![0; len],
            post_balances: vec![0; len],
            pre_token_balances: vec![],
            post_token_balances: vec![],
        }
    }

    fn owned(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn decimal(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn native_delta_includes_fee_from_snapshots() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &[]);
        tx.fee = 5_000_000;
        tx.pre_balances = vec![1_000_000_000];
        tx.post_balances = vec![995_000_000];

        let changes = compute_changes(&tx, &owner, &HashSet::new(), &TokenList::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].ticker.as_deref(), Some("SOL"));
        assert_eq!(changes[0].change_amount, decimal("-0.005"));
    }

    #[test]
    fn zero_native_delta_is_dropped() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &[]);
        tx.pre_balances = vec![42];
        tx.post_balances = vec![42];

        assert!(compute_changes(&tx, &owner, &HashSet::new(), &TokenList::default()).is_empty());
    }

    #[test]
    fn native_delta_only_counts_the_owner_index() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["counterparty"]);
        tx.pre_balances = vec![2_000_000_000, 0];
        tx.post_balances = vec![1_000_000_000, 1_000_000_000];

        let changes = compute_changes(&tx, &owner, &HashSet::new(), &TokenList::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_amount, decimal("-1"));
    }

    #[test]
    fn owner_absent_from_transaction_contributes_nothing() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&Pubkey::new_unique(), &[]);
        tx.pre_balances = vec![10];
        tx.post_balances = vec![0];

        assert!(native_change(&tx, &owner).is_none());
    }

    #[test]
    fn same_mint_accounts_are_not_netted() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["ata1", "ata2"]);
        tx.pre_token_balances = vec![snapshot(1, "mintX", "500", 2), snapshot(2, "mintX", "500", 2)];
        tx.post_token_balances = vec![snapshot(1, "mintX", "600", 2), snapshot(2, "mintX", "400", 2)];
        let symbols = TokenList::from_entries([("mintX", "XTK")]);

        let changes = compute_changes(&tx, &owner, &owned(&["ata1", "ata2"]), &symbols);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].change_amount, decimal("1.00"));
        assert_eq!(changes[0].change_amount.to_string(), "1.00");
        assert_eq!(changes[1].change_amount, decimal("-1.00"));
        assert!(changes.iter().all(|c| c.ticker.as_deref() == Some("XTK")));
    }

    #[test]
    fn token_delta_is_exact_beyond_f64_precision() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["ata"]);
        // 2^53 + 1 cannot be represented by an f64.
        tx.pre_token_balances = vec![snapshot(1, "mintBig", "9007199254740993", 6)];
        tx.post_token_balances = vec![snapshot(1, "mintBig", "18446744073709551615", 6)];

        let changes = compute_changes(&tx, &owner, &owned(&["ata"]), &TokenList::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_amount, decimal("18437736874454.810622"));
    }

    #[test]
    fn unknown_mint_keeps_entry_with_empty_ticker() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["ata"]);
        tx.pre_token_balances = vec![snapshot(1, "mintUnknown", "0", 0)];
        tx.post_token_balances = vec![snapshot(1, "mintUnknown", "7", 0)];

        let changes = compute_changes(&tx, &owner, &owned(&["ata"]), &TokenList::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].ticker, None);
        assert_eq!(changes[0].change_amount, decimal("7"));
    }

    #[test]
    fn accounts_not_owned_or_missing_snapshots_are_skipped() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["foreign", "opened", "zero"]);
        tx.pre_token_balances = vec![snapshot(1, "m", "0", 0), snapshot(3, "m", "5", 0)];
        tx.post_token_balances = vec![
            snapshot(1, "m", "100", 0),
            snapshot(2, "m", "100", 0),
            snapshot(3, "m", "5", 0),
        ];

        let changes = compute_changes(&tx, &owner, &owned(&["opened", "zero"]), &TokenList::default());

        assert!(changes.is_empty());
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let owner = Pubkey::new_unique();
        let mut tx = tx(&owner, &["ata"]);
        tx.pre_balances = vec![10, 0];
        tx.post_balances = vec![3, 0];
        tx.pre_token_balances = vec![snapshot(1, "m", "1", 3)];
        tx.post_token_balances = vec![snapshot(1, "m", "2", 3)];
        let owned = owned(&["ata"]);
        let symbols = TokenList::from_entries([("m", "M")]);

        let first = compute_changes(&tx, &owner, &owned, &symbols);
        let second = compute_changes(&tx, &owner, &owned, &symbols);

        assert_eq!(first, second);
        assert!(first.iter().all(|c| !c.change_amount.is_zero()));
    }
}
