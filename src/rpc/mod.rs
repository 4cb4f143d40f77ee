pub mod client;
pub mod wire;

use crate::error::AppError;
use crate::solana::models::RawTransaction;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

/// The three RPC calls a history page is assembled from.
///
/// Implementations perform no throttling; the fetcher gates every call.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Up to `limit` confirmed signatures for `owner`, newest first,
    /// strictly older than `before` when given.
    async fn get_signatures_for_address(
        &self,
        owner: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<String>, AppError>;

    /// Finalized transactions in the order of `signatures`. `None` marks a
    /// signature the node could not resolve or a payload that failed to parse.
    async fn get_parsed_transactions(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<RawTransaction>>, AppError>;

    /// Addresses of the token accounts `owner` holds under `program_id`.
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &str,
    ) -> Result<Vec<String>, AppError>;
}
