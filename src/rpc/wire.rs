//! Serde shapes of the JSON-RPC responses this crate consumes.
//!
//! Only the fields the history pipeline reads are declared; everything else
//! in the payload is ignored so that additive node upgrades do not break
//! decoding.

use serde::Deserialize;
use serde_json::Value;

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope<T> {
    #[serde(default)]
    pub id: Option<u64>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `getTokenAccountsByOwner` result: `{ context, value: [{ pubkey, account }] }`.
#[derive(Debug, Deserialize)]
pub struct TokenAccountsResponse {
    pub value: Vec<KeyedAccount>,
}

#[derive(Debug, Deserialize)]
pub struct KeyedAccount {
    pub pubkey: String,
}

/// `getTransaction` result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    pub transaction: WireTransaction,
    #[serde(default)]
    pub meta: Option<WireMeta>,
}

#[derive(Debug, Deserialize)]
pub struct WireTransaction {
    pub signatures: Vec<String>,
    pub message: WireMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub account_keys: Vec<WireAccountKey>,
}

/// `jsonParsed` encoding returns account objects, `json` returns bare strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireAccountKey {
    Parsed { pubkey: String },
    Plain(String),
}

impl WireAccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            WireAccountKey::Parsed { pubkey } => pubkey,
            WireAccountKey::Plain(pubkey) => pubkey,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMeta {
    #[serde(default)]
    pub err: Option<Value>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<WireTokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<WireTokenBalance>>,
    #[serde(default)]
    pub loaded_addresses: Option<WireLoadedAddresses>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTokenBalance {
    pub account_index: usize,
    pub mint: String,
    pub ui_token_amount: WireTokenAmount,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}
