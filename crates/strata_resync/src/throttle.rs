//! Throughput throttling.

use std::time::Duration;
use strata_core::CancellationToken;

/// Paces a sequence of work units to a fraction of full speed.
///
/// After a unit of work that took `w`, the throttle idles for
/// `w × (1 − s) / s`, so working time makes up a fraction `s` of the total.
/// At `s = 1.0` it never idles.
#[derive(Debug)]
pub struct Throttle {
    idle_ratio: f64,
    max_pause: Option<Duration>,
    paused: Duration,
}

impl Throttle {
    /// Creates a throttle for `desired_speed`, which must be in `(0.0, 1.0]`.
    pub fn new(desired_speed: f64, max_pause: Option<Duration>) -> Self {
        Self {
            idle_ratio: (1.0 - desired_speed) / desired_speed,
            max_pause,
            paused: Duration::ZERO,
        }
    }

    /// Returns true if `speed` is a usable throttle rate.
    pub fn is_valid_speed(speed: f64) -> bool {
        speed.is_finite() && speed > 0.0 && speed <= 1.0
    }

    /// Pause owed after a unit of work that took `work`.
    pub fn pause_for(&self, work: Duration) -> Duration {
        if self.idle_ratio <= 0.0 {
            return Duration::ZERO;
        }
        let nanos = (work.as_nanos() as f64 * self.idle_ratio).round();
        let pause = Duration::from_nanos(nanos.min(u64::MAX as f64) as u64);
        match self.max_pause {
            Some(max) => pause.min(max),
            None => pause,
        }
    }

    /// Idles after a unit of work, waking early on cancellation.
    ///
    /// Returns true if the token was canceled.
    pub fn pace(&mut self, work: Duration, token: &CancellationToken) -> bool {
        let pause = self.pause_for(work);
        if pause.is_zero() {
            return token.is_canceled();
        }
        self.paused += pause;
        token.wait_timeout(pause)
    }

    /// Total pause time requested so far.
    pub fn paused(&self) -> Duration {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn full_speed_never_pauses() {
        let throttle = Throttle::new(1.0, None);
        assert_eq!(throttle.pause_for(Duration::from_secs(3)), Duration::ZERO);
    }

    #[test]
    fn half_speed_idles_as_long_as_it_works() {
        let throttle = Throttle::new(0.5, None);
        assert_eq!(
            throttle.pause_for(Duration::from_millis(40)),
            Duration::from_millis(40)
        );
    }

    #[test]
    fn quarter_speed_idles_three_times_as_long() {
        let throttle = Throttle::new(0.25, None);
        assert_eq!(
            throttle.pause_for(Duration::from_millis(10)),
            Duration::from_millis(30)
        );
    }

    #[test]
    fn max_pause_caps_idle_time() {
        let throttle = Throttle::new(0.01, Some(Duration::from_millis(5)));
        assert_eq!(
            throttle.pause_for(Duration::from_millis(100)),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn speed_validation() {
        assert!(Throttle::is_valid_speed(1.0));
        assert!(Throttle::is_valid_speed(0.001));
        assert!(!Throttle::is_valid_speed(0.0));
        assert!(!Throttle::is_valid_speed(1.5));
        assert!(!Throttle::is_valid_speed(-0.5));
        assert!(!Throttle::is_valid_speed(f64::NAN));
    }

    #[test]
    fn pace_accumulates_and_sleeps() {
        let mut throttle = Throttle::new(0.5, None);
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(!throttle.pace(Duration::from_millis(15), &token));
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(throttle.paused(), Duration::from_millis(15));
    }

    #[test]
    fn pace_returns_early_when_canceled() {
        let mut throttle = Throttle::new(0.001, None);
        let token = CancellationToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(throttle.pace(Duration::from_secs(1), &token));
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
