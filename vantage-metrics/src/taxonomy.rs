/// Bounded error-kind label used as every error counter's `reason` tag.
/// Deliberately a closed enum, not a `String`, so a call site cannot
/// accidentally register an unbounded-cardinality label (a raw error
/// message, an order id) on a metric.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorReason {
    /// Network, 5xx, rate limit — safe to retry with backoff.
    Transient,
    /// Invalid args, insufficient funds, not found, precondition failed.
    Deterministic,
    /// Duplicate `client_order_id` with matching state, treated as success.
    IdempotentSuccess,
    /// Feed/data older than its configured TTL.
    Staleness,
    /// Credential/connectivity failure on boot.
    FatalStartup,
    /// Invariant violation or panic; actor isolated, alert emitted.
    FatalInternal,
}

impl ErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorReason::Transient => "transient",
            ErrorReason::Deterministic => "deterministic",
            ErrorReason::IdempotentSuccess => "idempotent_success",
            ErrorReason::Staleness => "staleness",
            ErrorReason::FatalStartup => "fatal_startup",
            ErrorReason::FatalInternal => "fatal_internal",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded label for a durable workflow step's terminal status.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WorkflowOutcome {
    Success,
    Failed,
    Pending,
}

impl WorkflowOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowOutcome::Success => "success",
            WorkflowOutcome::Failed => "failed",
            WorkflowOutcome::Pending => "pending",
        }
    }
}

impl std::fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reason_labels_are_stable_strings() {
        assert_eq!(ErrorReason::Transient.as_str(), "transient");
        assert_eq!(ErrorReason::FatalInternal.as_str(), "fatal_internal");
    }
}
