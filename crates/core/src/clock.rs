//! Bookkeeping for the day countdown driven by an external scheduler.

use std::time::Duration;

/// Default spacing between clock ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Remaining seconds below which frontends should warn the player.
pub const LOW_TIME_SECONDS: f64 = 15.0;

/// Running state of the day countdown. Every start hands out a new epoch so
/// ticks from a stopped or replaced scheduler can be told apart.
#[derive(Debug, Clone)]
pub struct DayClock {
    interval: Duration,
    running: bool,
    epoch: u64,
}

impl Default for DayClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl DayClock {
    /// Create a stopped clock ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            epoch: 0,
        }
    }

    /// Start a new run and return its epoch.
    pub fn start(&mut self) -> u64 {
        self.epoch += 1;
        self.running = true;
        self.epoch
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Epoch of the latest run.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Seconds of day time one tick consumes.
    pub fn step_seconds(&self) -> f64 {
        self.interval.as_secs_f64()
    }

    /// Whether a tick stamped with `epoch` belongs to the live run.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.running && epoch == self.epoch
    }
}

/// Whether `remaining` seconds should be flagged as running out.
pub fn is_time_low(remaining: f64) -> bool {
    remaining > 0.0 && remaining < LOW_TIME_SECONDS
}

/// Share of `max_time` already used, as a percentage.
pub fn time_efficiency(remaining: f64, max_time: f64) -> f64 {
    if max_time <= 0.0 {
        return 0.0;
    }
    ((max_time - remaining) / max_time) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_epochs_are_rejected() {
        let mut clock = DayClock::default();
        assert!(!clock.accepts(0));
        let first = clock.start();
        assert!(clock.accepts(first));
        let second = clock.start();
        assert!(!clock.accepts(first));
        assert!(clock.accepts(second));
        clock.stop();
        assert!(!clock.accepts(second));
    }

    #[test]
    fn tick_step_matches_interval() {
        let clock = DayClock::new(Duration::from_millis(250));
        assert!((clock.step_seconds() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn low_time_window() {
        assert!(is_time_low(14.9));
        assert!(!is_time_low(15.0));
        assert!(!is_time_low(0.0));
    }

    #[test]
    fn efficiency_is_a_percentage() {
        assert_eq!(time_efficiency(60.0, 60.0), 0.0);
        assert_eq!(time_efficiency(15.0, 60.0), 75.0);
        assert_eq!(time_efficiency(10.0, 0.0), 0.0);
    }
}
