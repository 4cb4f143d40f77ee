use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use wallet_explorer::config::AppConfig;
use wallet_explorer::error::AppError;
use wallet_explorer::history::{HistoryFetcher, WalletHistory};
use wallet_explorer::metrics;
use wallet_explorer::rate_gate::RateGate;
use wallet_explorer::rpc::client::RpcClient;
use wallet_explorer::telemetry;
use wallet_explorer::tokens::{TokenListSource, TokenRegistry};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    telemetry::init_telemetry(&config.log_level);
    metrics::init_metrics()?;

    info!(
        wallet = %config.wallet_address,
        rpc_http_url = %config.rpc_http_url,
        page_size = config.page_size,
        page_count = config.page_count,
        "Configuration loaded"
    );

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let rpc_client = RpcClient::new(config.rpc_http_url.clone(), timeout)?;

    let token_http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
    let tokens = Arc::new(TokenRegistry::new(
        TokenListSource::parse(&config.token_list_url),
        token_http,
    ));

    let gate = Arc::new(RateGate::per_second(config.rate_limit_per_second));
    let fetcher = HistoryFetcher::new(rpc_client, gate, tokens);
    let mut history = WalletHistory::new(config.wallet_address, config.page_size);

    let mut outcome = Ok(());
    for page in 1..=config.page_count {
        match history.load_more(&fetcher).await {
            Ok(records) => {
                for record in records {
                    let line = serde_json::to_string(record)
                        .map_err(|e| AppError::Decode(format!("Failed to encode record: {}", e)))?;
                    println!("{}", line);

                    info!(
                        hash = %record.hash,
                        datetime = %record
                            .timestamp()
                            .map(|ts| ts.format("%m/%d/%Y %H:%M:%S").to_string())
                            .unwrap_or_else(|| "unknown".to_string()),
                        status = ?record.status,
                        balances = record.balances.len(),
                        "Transaction"
                    );
                }
            }
            Err(e) => {
                error!(page = page, error = %e, "Failed to load history page");
                outcome = Err(e);
                break;
            }
        }

        if history.is_exhausted() {
            info!(page = page, "Reached the beginning of the wallet history");
            break;
        }
    }

    info!(
        records = history.records().len(),
        cursor = ?history.cursor(),
        "History loaded"
    );

    if config.print_metrics {
        eprintln!("{}", metrics::gather_metrics()?);
    }

    outcome
}
