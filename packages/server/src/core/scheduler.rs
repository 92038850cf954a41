//! Scheduler Fn (§4.F): a pure function computing the next attempt time from
//! `(driver, id, last_exec, tried)`. No I/O, no locking — it is safe to call
//! from the worker's hot path.

use std::sync::Arc;

/// `(driver, notify_id, last_exec_epoch_secs, tried) -> (next_at_epoch_secs, stop)`.
///
/// `stop=true` forces an immediate FAILED regardless of `tried`.
pub type SchedulerFn = Arc<dyn Fn(&str, &str, i64, u32) -> (i64, bool) + Send + Sync>;

/// Adds one minute for the first 10 tries; thereafter adds `(tried-10)^2`
/// minutes. Uses saturating arithmetic in place of the original's
/// `math.MinInt64`-clamped float math — same intent (never overflow), exact
/// rather than approximate.
pub fn default_scheduler(_driver: &str, _notify_id: &str, last_exec: i64, tried: u32) -> (i64, bool) {
    let delta_minutes: i64 = if tried > 10 {
        let over = i64::from(tried - 10);
        over.saturating_mul(over)
    } else {
        1
    };
    let delta_secs = delta_minutes.saturating_mul(60);
    (last_exec.saturating_add(delta_secs), false)
}

pub fn default_scheduler_fn() -> SchedulerFn {
    Arc::new(default_scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ten_tries_add_one_minute() {
        for tried in 1..=10 {
            let (next, stop) = default_scheduler("x", "id", 1_000, tried);
            assert_eq!(next, 1_060);
            assert!(!stop);
        }
    }

    #[test]
    fn beyond_ten_tries_grows_quadratically() {
        let (next, _) = default_scheduler("x", "id", 1_000, 12);
        assert_eq!(next, 1_000 + 4 * 60);

        let (next, _) = default_scheduler("x", "id", 1_000, 20);
        assert_eq!(next, 1_000 + 100 * 60);
    }

    #[test]
    fn never_overflows_regardless_of_tried() {
        let (next, _) = default_scheduler("x", "id", i64::MAX - 10, u32::MAX);
        assert_eq!(next, i64::MAX);
    }

    #[test]
    fn monotonicity_matches_testable_property_seven() {
        for tried in 1..=50u32 {
            let (next, _) = default_scheduler("x", "id", 0, tried);
            assert!(next >= 60, "tried={tried} gave next={next}");
        }
    }
}
