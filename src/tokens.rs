use crate::error::AppError;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Maps a mint address to a ticker symbol.
pub trait SymbolLookup {
    fn symbol(&self, mint: &str) -> Option<&str>;
}

/// In-memory mint -> symbol table.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    symbols: HashMap<String, String>,
}

impl TokenList {
    pub fn from_entries<I, A, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, S)>,
        A: Into<String>,
        S: Into<String>,
    {
        Self {
            symbols: entries
                .into_iter()
                .map(|(address, symbol)| (address.into(), symbol.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Parse either a bare `[{address, symbol}]` array or a registry
    /// document of the form `{ "tokens": [...] }`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, AppError> {
        let document: TokenListDocument = serde_json::from_slice(bytes)
            .map_err(|e| AppError::TokenList(format!("Invalid token list: {}", e)))?;

        let entries = match document {
            TokenListDocument::Flat(entries) => entries,
            TokenListDocument::Registry { tokens } => tokens,
        };

        // First entry wins when a mint is listed twice.
        let mut symbols = HashMap::with_capacity(entries.len());
        for entry in entries {
            symbols.entry(entry.address).or_insert(entry.symbol);
        }

        Ok(Self { symbols })
    }
}

impl SymbolLookup for TokenList {
    fn symbol(&self, mint: &str) -> Option<&str> {
        self.symbols.get(mint).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenListDocument {
    Flat(Vec<TokenListEntry>),
    Registry { tokens: Vec<TokenListEntry> },
}

#[derive(Debug, Deserialize)]
struct TokenListEntry {
    address: String,
    symbol: String,
}

/// Where the token list is loaded from.
#[derive(Debug, Clone)]
pub enum TokenListSource {
    Url(String),
    File(PathBuf),
}

impl TokenListSource {
    /// http(s) locations are fetched, anything else is read from disk.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            TokenListSource::Url(location.to_string())
        } else {
            TokenListSource::File(PathBuf::from(location))
        }
    }
}

/// Long-lived token-symbol service.
///
/// The list is loaded once on first use and kept for the life of the
/// registry. A failed load leaves the cache empty, so the next call retries.
pub struct TokenRegistry {
    source: Option<TokenListSource>,
    http: reqwest::Client,
    cache: OnceCell<Arc<TokenList>>,
}

impl TokenRegistry {
    pub fn new(source: TokenListSource, http: reqwest::Client) -> Self {
        Self {
            source: Some(source),
            http,
            cache: OnceCell::new(),
        }
    }

    /// A registry that never fetches and always serves `list`.
    pub fn preloaded(list: TokenList) -> Self {
        Self {
            source: None,
            http: reqwest::Client::new(),
            cache: OnceCell::new_with(Some(Arc::new(list))),
        }
    }

    /// Return the cached list, loading it first if needed.
    pub async fn load(&self) -> Result<Arc<TokenList>, AppError> {
        self.cache
            .get_or_try_init(|| self.fetch())
            .await
            .map(Arc::clone)
    }

    /// Like `load`, but degrades to an empty table on failure.
    pub async fn lookup(&self) -> Arc<TokenList> {
        match self.load().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Token list unavailable, tickers will be empty");
                Arc::new(TokenList::default())
            }
        }
    }

    pub async fn resolve_symbol(&self, mint: &str) -> Option<String> {
        self.lookup().await.symbol(mint).map(str::to_string)
    }

    async fn fetch(&self) -> Result<Arc<TokenList>, AppError> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| AppError::TokenList("No token list source configured".to_string()))?;

        let bytes = match source {
            TokenListSource::Url(url) => {
                debug!(url = %url, "Fetching token list");
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .with_context(|| format!("failed to fetch token list from {}", url))?;
                response
                    .bytes()
                    .await
                    .with_context(|| format!("failed to read token list body from {}", url))?
                    .to_vec()
            }
            TokenListSource::File(path) => {
                debug!(path = %path.display(), "Reading token list");
                tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read token list {}", path.display()))?
            }
        };

        let list = TokenList::from_json_slice(&bytes)?;
        info!(tokens = list.len(), "Token list loaded");
        Ok(Arc::new(list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_and_registry_documents() {
        let flat = TokenList::from_json_slice(
            br#"[{"address":"mintA","symbol":"AAA"},{"address":"mintA","symbol":"DUP"}]"#,
        )
        .unwrap();
        assert_eq!(flat.symbol("mintA"), Some("AAA"));
        assert_eq!(flat.len(), 1);

        let registry = TokenList::from_json_slice(
            br#"{"name":"list","tokens":[{"chainId":101,"address":"mintB","symbol":"BBB","decimals":6}]}"#,
        )
        .unwrap();
        assert_eq!(registry.symbol("mintB"), Some("BBB"));
        assert_eq!(registry.symbol("unknown"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            TokenList::from_json_slice(b"{\"nope\": 1}"),
            Err(AppError::TokenList(_))
        ));
    }

    #[test]
    fn source_is_chosen_by_scheme() {
        assert!(matches!(
            TokenListSource::parse("https://example.com/list.json"),
            TokenListSource::Url(_)
        ));
        assert!(matches!(
            TokenListSource::parse("./tokenlist.json"),
            TokenListSource::File(_)
        ));
    }

    #[test]
    fn preloaded_registry_serves_without_fetching() {
        let registry = TokenRegistry::preloaded(TokenList::from_entries([("mintA", "AAA")]));

        let symbol = tokio_test::block_on(registry.resolve_symbol("mintA"));
        assert_eq!(symbol.as_deref(), Some("AAA"));
    }

    #[tokio::test]
    async fn failed_load_is_retried_on_next_call() {
        let path = std::env::temp_dir().join(format!(
            "wallet-explorer-tokens-{}-{}.json",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);

        let registry = TokenRegistry::new(TokenListSource::File(path.clone()), reqwest::Client::new());

        assert!(registry.load().await.is_err());
        assert_eq!(registry.resolve_symbol("mintA").await, None);

        std::fs::write(&path, br#"[{"address":"mintA","symbol":"AAA"}]"#).unwrap();

        assert_eq!(registry.resolve_symbol("mintA").await.as_deref(), Some("AAA"));
        let _ = std::fs::remove_file(&path);
    }
}
