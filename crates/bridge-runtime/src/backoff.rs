//! Exponential backoff with jitter for recovery reinit attempts (spec
//! §4.E: "base 1s, max 30s, jitter ±20%").

use std::time::Duration;

use rand::Rng;

/// Computes the delay before the `attempt`'th reinit attempt (0-indexed):
/// `min(base * 2^attempt, max)`, jittered by `±jitter_fraction`.
pub fn next_backoff(attempt: u32, base: Duration, max: Duration, jitter_fraction: f64) -> Duration {
    let exponent = attempt.min(20);
    let scaled = base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
    let capped = scaled.min(max);

    let jitter_fraction = jitter_fraction.clamp(0.0, 1.0);
    if jitter_fraction == 0.0 {
        return capped;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter_fraction)..=(1.0 + jitter_fraction));
    Duration::from_secs_f64((capped.as_secs_f64() * factor).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn grows_with_attempt_number() {
        let d0 = next_backoff(0, BASE, MAX, 0.0);
        let d1 = next_backoff(1, BASE, MAX, 0.0);
        let d2 = next_backoff(2, BASE, MAX, 0.0);
        assert_eq!(d0, Duration::from_secs(1));
        assert_eq!(d1, Duration::from_secs(2));
        assert_eq!(d2, Duration::from_secs(4));
    }

    #[test]
    fn clamps_at_max() {
        let d = next_backoff(10, BASE, MAX, 0.0);
        assert_eq!(d, MAX);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for attempt in 0..8 {
            let d = next_backoff(attempt, BASE, MAX, 0.2);
            let base_expected = next_backoff(attempt, BASE, MAX, 0.0);
            let lower = base_expected.mul_f64(0.8);
            let upper = base_expected.mul_f64(1.2);
            assert!(d >= lower && d <= upper, "attempt {attempt}: {d:?} not in [{lower:?}, {upper:?}]");
        }
    }

    #[test]
    fn never_exceeds_u32_shift_overflow() {
        let d = next_backoff(u32::MAX, BASE, MAX, 0.0);
        assert_eq!(d, MAX);
    }
}
