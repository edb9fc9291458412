//! Simulated network latency.
//!
//! Every simulator action pauses through a `Latency` before touching the
//! store, the way a real client would wait on a round trip. Production code
//! uses `SimulatedLatency`; tests use `NoLatency` so they run instantly.

use crate::config::LatencySettings;
use async_trait::async_trait;
use std::time::Duration;

/// Which round trip is being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedOp {
    SessionLoad,
    SignUp,
    SignIn,
    SignOut,
    FetchProgress,
    AddXp,
    CompleteLesson,
    ResetProgress,
}

#[async_trait]
pub trait Latency: Send + Sync {
    async fn pause(&self, op: SimulatedOp);
}

/// Returns immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLatency;

#[async_trait]
impl Latency for NoLatency {
    async fn pause(&self, _op: SimulatedOp) {}
}

/// Sleeps for the configured per-operation delay
#[derive(Debug, Clone)]
pub struct SimulatedLatency {
    settings: LatencySettings,
}

impl SimulatedLatency {
    pub fn new(settings: LatencySettings) -> Self {
        Self { settings }
    }

    pub fn delay_for(&self, op: SimulatedOp) -> Duration {
        if !self.settings.enabled {
            return Duration::ZERO;
        }
        let ms = match op {
            SimulatedOp::SessionLoad => self.settings.session_load_ms,
            SimulatedOp::SignUp | SimulatedOp::SignIn => self.settings.auth_ms,
            SimulatedOp::SignOut => self.settings.sign_out_ms,
            SimulatedOp::FetchProgress => self.settings.fetch_ms,
            SimulatedOp::AddXp => self.settings.add_xp_ms,
            SimulatedOp::CompleteLesson => self.settings.complete_lesson_ms,
            SimulatedOp::ResetProgress => self.settings.reset_ms,
        };
        self.settings.effective(ms)
    }
}

#[async_trait]
impl Latency for SimulatedLatency {
    async fn pause(&self, op: SimulatedOp) {
        let delay = self.delay_for(op);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Strategy described by the `[latency]` config section
pub fn from_settings(settings: &LatencySettings) -> std::sync::Arc<dyn Latency> {
    if settings.enabled {
        std::sync::Arc::new(SimulatedLatency::new(settings.clone()))
    } else {
        std::sync::Arc::new(NoLatency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_per_operation() {
        let latency = SimulatedLatency::new(LatencySettings::default());
        assert_eq!(latency.delay_for(SimulatedOp::SignIn), Duration::from_millis(500));
        assert_eq!(latency.delay_for(SimulatedOp::FetchProgress), Duration::from_millis(400));
        assert_eq!(latency.delay_for(SimulatedOp::AddXp), Duration::from_millis(300));
        assert_eq!(latency.delay_for(SimulatedOp::CompleteLesson), Duration::from_millis(350));
        assert_eq!(latency.delay_for(SimulatedOp::SignOut), Duration::ZERO);
    }

    #[test]
    fn test_disabled_latency_is_zero() {
        let settings = LatencySettings {
            enabled: false,
            ..Default::default()
        };
        let latency = SimulatedLatency::new(settings);
        assert_eq!(latency.delay_for(SimulatedOp::ResetProgress), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_sleeps() {
        let latency = SimulatedLatency::new(LatencySettings::default());
        let start = tokio::time::Instant::now();
        latency.pause(SimulatedOp::AddXp).await;
        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
