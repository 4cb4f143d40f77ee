use crate::error::AppError;
use crate::rpc::wire::{TransactionResponse, WireAccountKey, WireLoadedAddresses, WireTokenBalance};
use crate::solana::models::{RawTransaction, TokenBalanceSnapshot};
use tracing::debug;

/// Convert a `getTransaction` response into the crate's `RawTransaction`.
///
/// Fails when the response lacks the pieces every transaction must have
/// (status meta, a signature). Callers treat that as a skippable entry.
pub fn parse_transaction(response: TransactionResponse) -> Result<RawTransaction, AppError> {
    let TransactionResponse {
        slot,
        block_time,
        transaction,
        meta,
    } = response;

    let meta = meta.ok_or_else(|| AppError::ParseError("Transaction missing metadata".to_string()))?;

    let signature = transaction
        .signatures
        .first()
        .cloned()
        .ok_or_else(|| AppError::ParseError("Transaction has no signature".to_string()))?;

    let account_keys = resolve_account_keys(&transaction.message.account_keys, meta.loaded_addresses.as_ref());

    let raw = RawTransaction {
        signature,
        block_time,
        fee: meta.fee,
        failed: meta.err.is_some(),
        account_keys,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: snapshots(meta.pre_token_balances.unwrap_or_default()),
        post_token_balances: snapshots(meta.post_token_balances.unwrap_or_default()),
    };

    debug!(
        signature = %raw.signature,
        slot = slot,
        fee = raw.fee,
        failed = raw.failed,
        accounts = raw.account_keys.len(),
        "Parsed transaction"
    );

    Ok(raw)
}

/// `jsonParsed` messages already list lookup-table accounts; bare `json`
/// messages need the loaded addresses appended (writable, then readonly) so
/// that token balance indices line up with the key list.
fn resolve_account_keys(
    keys: &[WireAccountKey],
    loaded: Option<&WireLoadedAddresses>,
) -> Vec<String> {
    let mut resolved: Vec<String> = keys.iter().map(|key| key.pubkey().to_string()).collect();

    let plain = keys.iter().all(|key| matches!(key, WireAccountKey::Plain(_)));
    if plain {
        if let Some(loaded) = loaded {
            resolved.extend(loaded.writable.iter().cloned());
            resolved.extend(loaded.readonly.iter().cloned());
        }
    }

    resolved
}

fn snapshots(balances: Vec<WireTokenBalance>) -> Vec<TokenBalanceSnapshot> {
    balances
        .into_iter()
        .map(|balance| TokenBalanceSnapshot {
            account_index: balance.account_index,
            mint: balance.mint,
            amount: balance.ui_token_amount.amount,
            decimals: balance.ui_token_amount.decimals,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> TransactionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_json_parsed_transaction() {
        let raw = parse_transaction(response(json!({
            "slot": 42,
            "blockTime": 1_700_000_000,
            "transaction": {
                "signatures": ["sigA", "sigB"],
                "message": {
                    "accountKeys": [
                        { "pubkey": "owner", "signer": true, "writable": true, "source": "transaction" },
                        { "pubkey": "ata", "signer": false, "writable": true, "source": "transaction" }
                    ],
                    "instructions": [],
                    "recentBlockhash": "11111111111111111111111111111111"
                }
            },
            "meta": {
                "err": { "InstructionError": [0, "Custom"] },
                "status": { "Err": { "InstructionError": [0, "Custom"] } },
                "fee": 5000,
                "preBalances": [10, 20],
                "postBalances": [5, 20],
                "preTokenBalances": [{
                    "accountIndex": 1,
                    "mint": "mintX",
                    "uiTokenAmount": { "amount": "100", "decimals": 2, "uiAmount": 1.0, "uiAmountString": "1" }
                }],
                "postTokenBalances": []
            }
        })))
        .unwrap();

        assert_eq!(raw.signature, "sigA");
        assert_eq!(raw.block_time, Some(1_700_000_000));
        assert!(raw.failed);
        assert_eq!(raw.account_keys, vec!["owner", "ata"]);
        assert_eq!(raw.pre_token_balances.len(), 1);
        assert_eq!(raw.pre_token_balances[0].amount, "100");
        assert_eq!(raw.pre_token_balances[0].decimals, 2);
        assert!(raw.post_token_balances.is_empty());
    }

    #[test]
    fn appends_loaded_addresses_for_plain_keys() {
        let raw = parse_transaction(response(json!({
            "slot": 1,
            "blockTime": null,
            "transaction": {
                "signatures": ["sig"],
                "message": { "accountKeys": ["a", "b"] }
            },
            "meta": {
                "err": null,
                "fee": 0,
                "preBalances": [0, 0, 0, 0],
                "postBalances": [0, 0, 0, 0],
                "loadedAddresses": { "writable": ["w"], "readonly": ["r"] }
            }
        })))
        .unwrap();

        assert_eq!(raw.account_keys, vec!["a", "b", "w", "r"]);
        assert!(!raw.failed);
        assert_eq!(raw.block_time, None);
    }

    #[test]
    fn missing_meta_is_a_parse_error() {
        let err = parse_transaction(response(json!({
            "slot": 1,
            "transaction": {
                "signatures": ["sig"],
                "message": { "accountKeys": [] }
            },
            "meta": null
        })))
        .unwrap_err();

        assert!(matches!(err, AppError::ParseError(_)));
    }
}
