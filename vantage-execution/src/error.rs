use serde::{Deserialize, Serialize};
use thiserror::Error;
use vantage_instrument::{exchange::ExchangeId, Symbol};
use vantage_integration::TransportError;

/// Top-level error returned by every [`crate::exchange::Exchange`] call.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ClientError {
    #[error("connectivity: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("api: {0}")]
    Api(#[from] ApiError),

    #[error("failed to fetch account snapshot: {0}")]
    AccountSnapshot(String),

    #[error("failed to init account stream: {0}")]
    AccountStream(String),

    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

impl ClientError {
    /// Whether this error is safe to retry with backoff (a [`Transient`]
    /// kind per the error taxonomy), as opposed to a deterministic failure
    /// the caller should surface without retrying.
    ///
    /// [`Transient`]: crate
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connectivity(_) | ClientError::Api(ApiError::RateLimit)
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ConnectivityError {
    #[error("exchange offline: {0}")]
    ExchangeOffline(ExchangeId),

    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),
}

impl From<TransportError> for ConnectivityError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Deterministic failures mapped from the venue's own error vocabulary; none
/// of these should be retried by the executor.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimit,
    #[error("symbol {0} invalid: {1}")]
    SymbolInvalid(Symbol, String),
    #[error("asset {0} balance insufficient: {1}")]
    BalanceInsufficient(String, String),
    #[error("order rejected: {0}")]
    OrderRejected(String),
    #[error("order already cancelled")]
    OrderAlreadyCancelled,
    #[error("order already fully filled")]
    OrderAlreadyFullyFilled,
    #[error("order not found")]
    OrderNotFound,
    #[error("margin unavailable: {0}")]
    MarginUnavailable(String),
    #[error("insufficient collateral: {0}")]
    InsufficientCollateral(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum KeyError {
    #[error("exchange id: {0}")]
    ExchangeId(String),

    #[error("symbol: {0}")]
    Symbol(String),
}
