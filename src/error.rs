use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::RpcError;
use thiserror::Error;

/// Errors surfaced by the history pipeline.
///
/// Transport-level failures (`Rpc`, `RpcResponse`, `Decode`) fail a whole page.
/// `ParseError` and `TokenList` are absorbed by the pipeline and only logged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("RPC transport error: {0}")]
    Rpc(String),

    #[error("RPC error {code}: {message}")]
    RpcResponse { code: i64, message: String },

    #[error("RPC response decode error: {0}")]
    Decode(String),

    #[error("Transaction parsing error: {0}")]
    ParseError(String),

    #[error("Token list error: {0}")]
    TokenList(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Token list loading uses anyhow for context chains.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::TokenList(format!("{:#}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Rpc(err.to_string())
        }
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                AppError::RpcResponse {
                    code: *code,
                    message: message.clone(),
                }
            }
            ClientErrorKind::SerdeJson(e) => AppError::Decode(e.to_string()),
            _ => AppError::Rpc(err.to_string()),
        }
    }
}
