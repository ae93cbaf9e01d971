use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// General interface for implementing simple pre-trade risk checks.
///
/// See [`CheckHigherThan`] for a simple example.
///
/// # Associated Types
/// * `Input` - the value being validated (e.g. `Decimal` for a notional check)
/// * `Error` - the error returned when validation fails
pub trait RiskCheck {
    type Input;
    type Error;

    /// Name of the risk check, used in error messages and logging.
    fn name() -> &'static str;

    /// Performs the risk check on the provided `Input`.
    fn check(&self, input: &Self::Input) -> Result<(), Self::Error>;
}

/// Risk check that validates an input value does not exceed an upper limit.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckHigherThan<T> {
    /// Upper limit; the check passes if input `<= limit`.
    pub limit: T,
}

impl<T> RiskCheck for CheckHigherThan<T>
where
    T: Clone + PartialOrd,
{
    type Input = T;
    type Error = CheckFailHigherThan<T>;

    fn name() -> &'static str {
        "CheckHigherThan"
    }

    fn check(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if *input <= self.limit {
            Ok(())
        } else {
            Err(CheckFailHigherThan { limit: self.limit.clone(), input: input.clone() })
        }
    }
}

/// Error returned when a [`CheckHigherThan`] validation fails.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor, Error,
)]
#[error("CheckHigherThanFailed: input {input} > limit {limit}")]
pub struct CheckFailHigherThan<T> {
    pub limit: T,
    pub input: T,
}

/// Risk check ensuring the potential loss of an order does not exceed a limit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckLossLimit {
    pub limit: Decimal,
}

impl RiskCheck for CheckLossLimit {
    type Input = Decimal;
    type Error = CheckFailLossLimit;

    fn name() -> &'static str {
        "CheckLossLimit"
    }

    fn check(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if *input <= self.limit {
            Ok(())
        } else {
            Err(CheckFailLossLimit { limit: self.limit, loss: *input })
        }
    }
}

/// Error returned when a [`CheckLossLimit`] validation fails.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor, Error)]
#[error("CheckLossLimitFailed: loss {loss} > limit {limit}")]
pub struct CheckFailLossLimit {
    pub limit: Decimal,
    pub loss: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn check_higher_than_passes_at_the_boundary() {
        let check = CheckHigherThan::new(dec!(100));
        assert!(check.check(&dec!(100)).is_ok());
        assert!(check.check(&dec!(100.01)).is_err());
    }

    #[test]
    fn check_loss_limit_reports_the_offending_values() {
        let check = CheckLossLimit::new(dec!(50));
        let err = check.check(&dec!(75)).unwrap_err();
        assert_eq!(err, CheckFailLossLimit { limit: dec!(50), loss: dec!(75) });
    }
}
