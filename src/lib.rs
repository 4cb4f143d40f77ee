//! Paginated Solana wallet history with exact per-transaction balance changes.

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod rate_gate;
pub mod rpc;
pub mod solana;
pub mod telemetry;
pub mod tokens;
