use std::sync::atomic::{AtomicBool, Ordering};

/// Standard health RPC status: `SERVING` only while the venue connection is
/// healthy, `NOT_SERVING` otherwise. Containers probe this to decide
/// whether to route traffic to this process.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum HealthStatus {
    Serving,
    NotServing,
}

impl HealthStatus {
    pub fn is_serving(self) -> bool {
        matches!(self, HealthStatus::Serving)
    }
}

/// Shared, lock-free health flag updated by the venue-connection watchdog
/// and read by the `CheckHealth` RPC handler and the process's own
/// readiness probe.
#[derive(Debug, Default)]
pub struct HealthState {
    serving: AtomicBool,
}

impl HealthState {
    pub fn new(initially_serving: bool) -> Self {
        Self { serving: AtomicBool::new(initially_serving) }
    }

    pub fn status(&self) -> HealthStatus {
        if self.serving.load(Ordering::Acquire) {
            HealthStatus::Serving
        } else {
            HealthStatus::NotServing
        }
    }

    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_state_starts_in_the_constructed_status_and_flips_on_update() {
        let health = HealthState::new(true);
        assert_eq!(health.status(), HealthStatus::Serving);

        health.set_serving(false);
        assert_eq!(health.status(), HealthStatus::NotServing);
    }
}
