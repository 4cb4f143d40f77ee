use crate::error::AppError;
use crate::metrics;
use crate::rpc::wire::{RpcEnvelope, TokenAccountsResponse, TransactionResponse};
use crate::rpc::HistorySource;
use crate::solana::models::RawTransaction;
use crate::solana::parser::parse_transaction;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_client::rpc_config::{RpcSignaturesForAddressConfig, RpcTransactionConfig};
use solana_client::rpc_request::RpcRequest;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::UiTransactionEncoding;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// JSON-RPC client for a Solana HTTP endpoint.
///
/// Single calls go through solana-client's nonblocking `RpcClient`. The
/// `getTransaction` fan-out is sent as one JSON-RPC batch over reqwest, since
/// solana-client has no batch API.
pub struct RpcClient {
    rpc: SolanaRpcClient,
    endpoint: String,
    http: reqwest::Client,
    next_batch_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, AppError> {
        info!(endpoint = %endpoint, "Creating JSON-RPC client");

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            rpc: SolanaRpcClient::new_with_timeout(endpoint.clone(), timeout),
            endpoint,
            http,
            next_batch_id: AtomicU64::new(1),
        })
    }

    /// Send one request through solana-client and decode its `result`.
    async fn send<T: DeserializeOwned>(&self, request: RpcRequest, params: Value) -> Result<T, AppError> {
        debug!(method = %request, "Sending RPC request");
        metrics::RPC_REQUESTS.inc();

        Ok(self.rpc.send(request, params).await?)
    }

    /// Send a JSON-RPC batch of `request` with one parameter set per entry.
    ///
    /// Results come back undecoded, in the order of `params_list`; a `null`
    /// result is returned as `None`. Any error object fails the whole batch.
    async fn send_batch(
        &self,
        request: RpcRequest,
        params_list: Vec<Value>,
    ) -> Result<Vec<Option<Value>>, AppError> {
        if params_list.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = params_list
            .iter()
            .map(|_| self.next_batch_id.fetch_add(1, Ordering::Relaxed))
            .collect();
        let body = Value::Array(
            ids.iter()
                .zip(params_list)
                .map(|(id, params)| request.build_request_json(*id, params))
                .collect(),
        );
        debug!(method = %request, batch = ids.len(), "Sending RPC batch");
        metrics::RPC_REQUESTS.inc_by(ids.len() as u64);

        let envelopes: Vec<RpcEnvelope<Value>> = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("{} batch response: {}", request, e)))?;

        let mut by_id = HashMap::with_capacity(envelopes.len());
        for envelope in envelopes {
            if let Some(error) = envelope.error {
                return Err(AppError::RpcResponse {
                    code: error.code,
                    message: error.message,
                });
            }
            let id = envelope
                .id
                .ok_or_else(|| AppError::Decode(format!("{} batch entry has no id", request)))?;
            by_id.insert(id, envelope.result);
        }

        ids.iter()
            .map(|id| {
                by_id
                    .remove(id)
                    .ok_or_else(|| AppError::Decode(format!("{} batch is missing id {}", request, id)))
            })
            .collect()
    }
}

/// Decode one `getTransaction` result and normalize it.
fn decode_transaction(value: Value) -> Result<RawTransaction, AppError> {
    let response: TransactionResponse = serde_json::from_value(value)
        .map_err(|e| AppError::Decode(format!("getTransaction result: {}", e)))?;
    parse_transaction(response)
}

#[async_trait]
impl HistorySource for RpcClient {
    async fn get_signatures_for_address(
        &self,
        owner: &Pubkey,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<String>, AppError> {
        let config = RpcSignaturesForAddressConfig {
            before: before.map(str::to_string),
            until: None,
            limit: Some(limit),
            commitment: Some(CommitmentConfig::confirmed()),
            min_context_slot: None,
        };

        let statuses: Vec<RpcConfirmedTransactionStatusWithSignature> = self
            .send(RpcRequest::GetSignaturesForAddress, json!([owner.to_string(), config]))
            .await?;

        Ok(statuses.into_iter().map(|status| status.signature).collect())
    }

    async fn get_parsed_transactions(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<RawTransaction>>, AppError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::finalized()),
            max_supported_transaction_version: Some(0),
        };

        let params = signatures
            .iter()
            .map(|signature| json!([signature, config]))
            .collect();

        let results = self.send_batch(RpcRequest::GetTransaction, params).await?;

        // A malformed entry is dropped on its own; the caller counts it as skipped.
        Ok(signatures
            .iter()
            .zip(results)
            .map(|(signature, result)| match decode_transaction(result?) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    warn!(signature = %signature, error = %e, "Skipping malformed transaction");
                    None
                }
            })
            .collect())
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &str,
    ) -> Result<Vec<String>, AppError> {
        // Only the account addresses are needed, so skip the account data.
        let params = json!([
            owner.to_string(),
            { "programId": program_id },
            { "encoding": "base64", "dataSlice": { "offset": 0, "length": 0 } }
        ]);

        let response: TokenAccountsResponse = self
            .send(RpcRequest::GetTokenAccountsByOwner, params)
            .await?;

        Ok(response.value.into_iter().map(|account| account.pubkey).collect())
    }
}
