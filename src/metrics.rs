use crate::error::AppError;
use lazy_static::lazy_static;
use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).unwrap_or_else(|_| {
        IntCounter::new("wallet_explorer_fallback_total", "Fallback metric").unwrap()
    })
}

fn create_gate_wait_histogram() -> Result<Histogram, AppError> {
    Histogram::with_opts(
        HistogramOpts::new(
            "wallet_explorer_rate_gate_wait_seconds",
            "Time callers spend suspended in the rate gate",
        )
        .buckets(vec![0.0, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .map_err(|e| AppError::Config(format!("Failed to create rate_gate_wait metric: {}", e)))
}

lazy_static! {
    pub static ref RPC_REQUESTS: IntCounter = counter(
        "wallet_explorer_rpc_requests_total",
        "Total number of JSON-RPC requests sent"
    );
    pub static ref PAGES_FETCHED: IntCounter = counter(
        "wallet_explorer_pages_fetched_total",
        "Total number of history pages fetched"
    );
    pub static ref PAGES_FAILED: IntCounter = counter(
        "wallet_explorer_pages_failed_total",
        "Total number of history pages that failed"
    );
    pub static ref TRANSACTIONS_SKIPPED: IntCounter = counter(
        "wallet_explorer_transactions_skipped_total",
        "Transactions dropped because they were unresolvable or malformed"
    );
    pub static ref BALANCE_CHANGES: IntCounter = counter(
        "wallet_explorer_balance_changes_total",
        "Total number of non-zero balance changes computed"
    );
    pub static ref RATE_GATE_WAIT: Histogram = create_gate_wait_histogram().unwrap_or_else(|_| {
        Histogram::with_opts(HistogramOpts::new("wallet_explorer_fallback_wait", "Fallback metric")).unwrap()
    });
}

/// Register every metric with the process registry.
///
/// Call once at startup. A second call fails with a duplicate registration error.
pub fn init_metrics() -> Result<(), AppError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RPC_REQUESTS.clone()),
        Box::new(PAGES_FETCHED.clone()),
        Box::new(PAGES_FAILED.clone()),
        Box::new(TRANSACTIONS_SKIPPED.clone()),
        Box::new(BALANCE_CHANGES.clone()),
        Box::new(RATE_GATE_WAIT.clone()),
    ];

    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|e| AppError::Config(format!("Failed to register metric: {}", e)))?;
    }

    Ok(())
}

/// Get the metrics in Prometheus exposition format.
pub fn gather_metrics() -> Result<String, AppError> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Config(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| AppError::Config(format!("Failed to convert metrics to UTF-8: {}", e)))
}
