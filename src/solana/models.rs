use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// SPL Token program; owned token accounts are resolved under this id.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

pub const NATIVE_SYMBOL: &str = "SOL";

/// Lamports carry 9 decimal places (1 SOL = 1,000,000,000 lamports).
pub const NATIVE_DECIMALS: i64 = 9;

/// A transaction as the rest of the crate sees it, independent of the RPC
/// wire shape it arrived in.
///
/// Native balances and account keys are positional: index `i` of
/// `pre_balances` belongs to `account_keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// Base58-encoded primary signature
    pub signature: String,

    /// Unix timestamp of the block (may be None on some nodes)
    pub block_time: Option<i64>,

    /// Fee in lamports
    pub fee: u64,

    /// Whether the transaction carried an execution error
    pub failed: bool,

    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalanceSnapshot>,
    pub post_token_balances: Vec<TokenBalanceSnapshot>,
}

/// Token balance of one account position before or after a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalanceSnapshot {
    pub account_index: usize,
    pub mint: String,
    /// Raw integer amount in base units, as a decimal string
    pub amount: String,
    pub decimals: u8,
}

/// One non-zero delta of one asset within one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    /// Symbol of the asset, None when the token list has no entry for the mint
    pub ticker: Option<String>,

    /// Signed change in display units
    #[serde(serialize_with = "decimal_as_string")]
    pub change_amount: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// Normalized, display-facing view of one transaction in a wallet's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub hash: String,

    /// Block time in unix seconds
    pub datetime: Option<i64>,

    pub status: TransactionStatus,

    /// Fee in SOL
    #[serde(serialize_with = "decimal_as_string")]
    pub fee: BigDecimal,

    pub balances: Vec<BalanceChange>,
}

impl TransactionRecord {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.datetime
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
    }
}

fn decimal_as_string<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}
