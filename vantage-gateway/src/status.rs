use vantage_execution::{ApiError, ClientError, ConnectivityError, KeyError};
use vantage_metrics::ErrorReason;

/// Map a venue-side error to the `tonic::Status` wire vocabulary: `Transient`
/// kinds go to codes a client's backoff policy retries, `Deterministic`
/// kinds go to codes it surfaces without retrying.
pub fn client_error_to_status(error: &ClientError) -> tonic::Status {
    match error {
        ClientError::Connectivity(ConnectivityError::ExchangeOffline(id)) => {
            tonic::Status::unavailable(format!("exchange offline: {id}"))
        }
        ClientError::Connectivity(ConnectivityError::Timeout) => tonic::Status::deadline_exceeded("request timed out"),
        ClientError::Connectivity(ConnectivityError::Transport(message)) => tonic::Status::unavailable(message.clone()),
        ClientError::Api(ApiError::RateLimit) => tonic::Status::resource_exhausted("rate limit exceeded"),
        ClientError::Api(ApiError::SymbolInvalid(symbol, reason)) => {
            tonic::Status::invalid_argument(format!("symbol {symbol} invalid: {reason}"))
        }
        ClientError::Api(ApiError::BalanceInsufficient(asset, reason)) => {
            tonic::Status::failed_precondition(format!("{asset} balance insufficient: {reason}"))
        }
        ClientError::Api(ApiError::OrderRejected(reason)) => tonic::Status::failed_precondition(reason.clone()),
        ClientError::Api(ApiError::OrderAlreadyCancelled) => tonic::Status::already_exists("order already cancelled"),
        ClientError::Api(ApiError::OrderAlreadyFullyFilled) => {
            tonic::Status::already_exists("order already fully filled")
        }
        ClientError::Api(ApiError::OrderNotFound) => tonic::Status::not_found("order not found"),
        ClientError::Api(ApiError::MarginUnavailable(reason)) => tonic::Status::failed_precondition(reason.clone()),
        ClientError::Api(ApiError::InsufficientCollateral(reason)) => {
            tonic::Status::failed_precondition(reason.clone())
        }
        ClientError::AccountSnapshot(reason) => tonic::Status::unavailable(reason.clone()),
        ClientError::AccountStream(reason) => tonic::Status::unavailable(reason.clone()),
        ClientError::Key(KeyError::ExchangeId(reason)) => tonic::Status::invalid_argument(reason.clone()),
        ClientError::Key(KeyError::Symbol(reason)) => tonic::Status::invalid_argument(reason.clone()),
    }
}

/// Bounded label for a metrics `reason` tag, derived from the same error
/// without exposing its raw message.
pub fn client_error_reason(error: &ClientError) -> ErrorReason {
    if error.is_transient() {
        ErrorReason::Transient
    } else {
        ErrorReason::Deterministic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_resource_exhausted_and_is_transient() {
        let error = ClientError::Api(ApiError::RateLimit);
        assert_eq!(client_error_to_status(&error).code(), tonic::Code::ResourceExhausted);
        assert_eq!(client_error_reason(&error), ErrorReason::Transient);
    }

    #[test]
    fn order_not_found_maps_to_not_found_and_is_deterministic() {
        let error = ClientError::Api(ApiError::OrderNotFound);
        assert_eq!(client_error_to_status(&error).code(), tonic::Code::NotFound);
        assert_eq!(client_error_reason(&error), ErrorReason::Deterministic);
    }
}
