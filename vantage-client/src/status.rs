use vantage_execution::{ApiError, ClientError, ConnectivityError};
use vantage_metrics::ErrorReason;

/// Bounded metrics label derived from a [`ClientError`] without exposing its
/// raw message.
pub fn client_error_reason(error: &ClientError) -> ErrorReason {
    if error.is_transient() {
        ErrorReason::Transient
    } else {
        ErrorReason::Deterministic
    }
}

/// Best-effort inverse of the gateway's `ClientError -> tonic::Status`
/// mapping: the wire only carries a `tonic::Code` and a free-text message,
/// so this recovers the error *kind* (transient vs. deterministic) precisely
/// and approximates the original variant from the message.
pub fn status_to_client_error(status: tonic::Status) -> ClientError {
    let message = status.message().to_owned();
    match status.code() {
        tonic::Code::Unavailable => ClientError::Connectivity(ConnectivityError::Transport(message)),
        tonic::Code::DeadlineExceeded => ClientError::Connectivity(ConnectivityError::Timeout),
        tonic::Code::ResourceExhausted => ClientError::Api(ApiError::RateLimit),
        tonic::Code::NotFound => ClientError::Api(ApiError::OrderNotFound),
        tonic::Code::AlreadyExists => ClientError::Api(ApiError::OrderAlreadyCancelled),
        tonic::Code::InvalidArgument | tonic::Code::FailedPrecondition => {
            ClientError::Api(ApiError::OrderRejected(message))
        }
        _ => ClientError::Connectivity(ConnectivityError::Transport(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_exhausted_round_trips_to_a_transient_rate_limit_error() {
        let status = tonic::Status::resource_exhausted("rate limit exceeded");
        let error = status_to_client_error(status);
        assert!(error.is_transient());
        assert_eq!(error, ClientError::Api(ApiError::RateLimit));
    }

    #[test]
    fn not_found_round_trips_to_a_deterministic_error() {
        let status = tonic::Status::not_found("order not found");
        let error = status_to_client_error(status);
        assert!(!error.is_transient());
    }
}
