pub mod fetcher;
pub mod session;

pub use fetcher::{HistoryFetcher, HistoryPage};
pub use session::WalletHistory;
