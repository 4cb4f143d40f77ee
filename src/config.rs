use crate::error::AppError;
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;

pub const DEFAULT_RPC_HTTP_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_TOKEN_LIST_URL: &str =
    "https://raw.githubusercontent.com/solana-labs/token-list/main/src/tokens/solana.tokenlist.json";

/// Application configuration loaded from environment variables.
///
/// All configuration values are validated during construction to fail fast
/// if the environment is misconfigured.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub wallet_address: Pubkey,
    pub rpc_http_url: String,
    pub token_list_url: String,
    pub rate_limit_per_second: u32,
    pub page_size: usize,
    pub page_count: usize,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub print_metrics: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - WALLET_ADDRESS: base58 public key of the wallet to explore
    ///
    /// Optional environment variables:
    /// - RPC_HTTP_URL: HTTP RPC endpoint (defaults to public Solana mainnet)
    /// - TOKEN_LIST_URL: token list URL or local file path
    /// - RATE_LIMIT_PER_SECOND: outbound RPC ceiling (default: 10)
    /// - PAGE_SIZE: transactions per page (default: 10)
    /// - PAGE_COUNT: pages to load (default: 1)
    /// - REQUEST_TIMEOUT_SECS: HTTP timeout (default: 30)
    /// - LOG_LEVEL: Logging level (default: "info")
    /// - PRINT_METRICS: dump Prometheus metrics on exit (default: "false")
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wallet = lookup("WALLET_ADDRESS")
            .ok_or_else(|| AppError::Config("WALLET_ADDRESS not set".to_string()))?;
        let wallet_address = Self::parse_wallet_address(&wallet)?;

        let rpc_http_url =
            lookup("RPC_HTTP_URL").unwrap_or_else(|| DEFAULT_RPC_HTTP_URL.to_string());
        Self::validate_http_url("RPC_HTTP_URL", &rpc_http_url)?;

        let token_list_url =
            lookup("TOKEN_LIST_URL").unwrap_or_else(|| DEFAULT_TOKEN_LIST_URL.to_string());

        let rate_limit_per_second = parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 10u32)?;
        if rate_limit_per_second == 0 {
            return Err(AppError::Config(
                "RATE_LIMIT_PER_SECOND must be greater than zero".to_string(),
            ));
        }

        let page_size = parse_or(&lookup, "PAGE_SIZE", 10usize)?;
        if page_size == 0 {
            return Err(AppError::Config(
                "PAGE_SIZE must be greater than zero".to_string(),
            ));
        }

        let page_count = parse_or(&lookup, "PAGE_COUNT", 1usize)?;
        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?;
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let print_metrics = lookup("PRINT_METRICS")
            .and_then(|val| val.parse::<bool>().ok())
            .unwrap_or(false);

        Ok(Self {
            wallet_address,
            rpc_http_url,
            token_list_url,
            rate_limit_per_second,
            page_size,
            page_count,
            request_timeout_secs,
            log_level,
            print_metrics,
        })
    }

    /// Validate that a string is a base58-encoded 32-byte Solana address.
    pub fn parse_wallet_address(address: &str) -> Result<Pubkey, AppError> {
        let address = address.trim();
        bs58::decode(address)
            .into_vec()
            .map_err(|e| AppError::Config(format!("Invalid base58 address: {}", e)))?;

        Pubkey::from_str(address)
            .map_err(|e| AppError::Config(format!("Invalid wallet pubkey: {}", e)))
    }

    fn validate_http_url(name: &str, url: &str) -> Result<(), AppError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "{} must be an HTTP/HTTPS URL (http:// or https://), got: {}",
                name, url
            )));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", key, e))),
        None => Ok(default),
    }
}
