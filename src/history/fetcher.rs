use crate::error::AppError;
use crate::metrics;
use crate::rate_gate::RateGate;
use crate::rpc::HistorySource;
use crate::solana::balance::compute_changes;
use crate::solana::models::{
    RawTransaction, TransactionRecord, TransactionStatus, NATIVE_DECIMALS, TOKEN_PROGRAM_ID,
};
use crate::tokens::{SymbolLookup, TokenRegistry};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One page of history and where the next page starts.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub records: Vec<TransactionRecord>,
    /// Last signature requested for this page, including ones that were
    /// skipped. `None` when the signature listing came back empty.
    pub next_cursor: Option<String>,
}

/// Assembles pages of a wallet's transaction history.
///
/// Stateless between calls: the same `(owner, page_size, cursor)` returns the
/// same page until new transactions land.
pub struct HistoryFetcher<S> {
    source: S,
    gate: Arc<RateGate>,
    tokens: Arc<TokenRegistry>,
}

impl<S: HistorySource> HistoryFetcher<S> {
    pub fn new(source: S, gate: Arc<RateGate>, tokens: Arc<TokenRegistry>) -> Self {
        Self {
            source,
            gate,
            tokens,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch up to `page_size` records older than `cursor`, newest first.
    ///
    /// Any RPC failure fails the page as a whole. Unresolvable or malformed
    /// transactions are dropped, so a page may hold fewer than `page_size`
    /// records, or none while older history remains.
    pub async fn fetch_page(
        &self,
        owner: &Pubkey,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<HistoryPage, AppError> {
        if page_size == 0 {
            return Ok(HistoryPage {
                records: Vec::new(),
                next_cursor: cursor.map(str::to_string),
            });
        }

        info!(owner = %owner, page_size = page_size, cursor = ?cursor, "Fetching history page");

        let result = self.assemble_page(owner, page_size, cursor).await;
        match &result {
            Ok(page) => {
                metrics::PAGES_FETCHED.inc();
                info!(
                    owner = %owner,
                    records = page.records.len(),
                    next_cursor = ?page.next_cursor,
                    "History page fetched"
                );
            }
            Err(e) => {
                metrics::PAGES_FAILED.inc();
                warn!(owner = %owner, error = %e, "History page failed");
            }
        }
        result
    }

    async fn assemble_page(
        &self,
        owner: &Pubkey,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<HistoryPage, AppError> {
        // Signatures and owned accounts do not depend on each other.
        let (mut signatures, owned_accounts) = futures::future::try_join(
            self.signatures(owner, page_size, cursor),
            self.owned_token_accounts(owner),
        )
        .await?;

        signatures.truncate(page_size);
        let next_cursor = match signatures.last() {
            Some(signature) => signature.clone(),
            None => {
                return Ok(HistoryPage {
                    records: Vec::new(),
                    next_cursor: None,
                })
            }
        };

        self.gate.acquire_many(signatures.len()).await;
        let transactions = self.source.get_parsed_transactions(&signatures).await?;

        let symbols = self.tokens.lookup().await;

        let records = signatures
            .iter()
            .zip(transactions)
            .filter_map(|(signature, tx)| match tx {
                Some(tx) => Some(build_record(&tx, owner, &owned_accounts, &*symbols)),
                None => {
                    metrics::TRANSACTIONS_SKIPPED.inc();
                    warn!(signature = %signature, "Transaction unavailable, skipping");
                    None
                }
            })
            .collect();

        Ok(HistoryPage {
            records,
            next_cursor: Some(next_cursor),
        })
    }

    async fn signatures(
        &self,
        owner: &Pubkey,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        self.gate.acquire().await;
        let signatures = self
            .source
            .get_signatures_for_address(owner, page_size, cursor)
            .await?;
        debug!(count = signatures.len(), "Signatures resolved");
        Ok(signatures)
    }

    async fn owned_token_accounts(&self, owner: &Pubkey) -> Result<HashSet<String>, AppError> {
        self.gate.acquire().await;
        let accounts = self
            .source
            .get_token_accounts_by_owner(owner, TOKEN_PROGRAM_ID)
            .await?;
        debug!(count = accounts.len(), "Owned token accounts resolved");
        Ok(accounts.into_iter().collect())
    }
}

fn build_record(
    tx: &RawTransaction,
    owner: &Pubkey,
    owned_accounts: &HashSet<String>,
    symbols: &dyn SymbolLookup,
) -> TransactionRecord {
    let balances = compute_changes(tx, owner, owned_accounts, symbols);
    metrics::BALANCE_CHANGES.inc_by(balances.len() as u64);

    debug!(
        signature = %tx.signature,
        balance_changes = balances.len(),
        failed = tx.failed,
        "Computed transaction record"
    );

    TransactionRecord {
        hash: tx.signature.clone(),
        datetime: tx.block_time,
        status: if tx.failed {
            TransactionStatus::Failed
        } else {
            TransactionStatus::Success
        },
        fee: BigDecimal::new(BigInt::from(tx.fee), NATIVE_DECIMALS),
        balances,
    }
}
