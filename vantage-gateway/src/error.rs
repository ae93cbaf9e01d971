use thiserror::Error;
use vantage_execution::ClientError;

/// Gateway-process-level errors.
///
/// `CredentialValidation` is a [`crate`]-internal `Fatal-Startup` error: the
/// caller (the `gateway` binary's `main`) must exit non-zero rather than
/// start serving with bad credentials.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("venue credential validation failed: {0}")]
    CredentialValidation(#[source] ClientError),

    #[error("shutdown deadline elapsed with {0} stream(s) still draining")]
    ShutdownTimedOut(usize),
}
