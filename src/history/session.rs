use crate::error::AppError;
use crate::history::fetcher::HistoryFetcher;
use crate::rpc::HistorySource;
use crate::solana::models::TransactionRecord;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use tracing::debug;

/// The accumulated history of one wallet, grown a page at a time.
///
/// Switching wallets means starting a new `WalletHistory`; results of a page
/// request issued for another wallet should simply be dropped.
#[derive(Debug, Clone)]
pub struct WalletHistory {
    owner: Pubkey,
    page_size: usize,
    records: Vec<TransactionRecord>,
    seen: HashSet<String>,
    cursor: Option<String>,
    exhausted: bool,
}

impl WalletHistory {
    pub fn new(owner: Pubkey, page_size: usize) -> Self {
        Self {
            owner,
            page_size,
            records: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            exhausted: false,
        }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// Last signature requested so far; the next page starts before it.
    ///
    /// Usually the hash of the oldest record, but it also moves past
    /// signatures that could not be resolved.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// True once the signature listing came back empty.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Load the next page and append the records not already present.
    ///
    /// Returns the newly appended records. On error nothing changes, so the
    /// same call can be retried.
    pub async fn load_more<S: HistorySource>(
        &mut self,
        fetcher: &HistoryFetcher<S>,
    ) -> Result<&[TransactionRecord], AppError> {
        let page = fetcher
            .fetch_page(&self.owner, self.page_size, self.cursor())
            .await?;

        match page.next_cursor {
            Some(next) => self.cursor = Some(next),
            None => self.exhausted = true,
        }

        let start = self.records.len();
        for record in page.records {
            if self.seen.insert(record.hash.clone()) {
                self.records.push(record);
            } else {
                debug!(owner = %self.owner, hash = %record.hash, "Dropping record already in history");
            }
        }

        Ok(&self.records[start..])
    }
}
