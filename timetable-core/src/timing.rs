//! Sync-push scheduling.
//!
//! The periodic sync push is aligned to the *simulated* clock: the delay
//! before the next tick is shortened so the tick lands just after the
//! simulated time crosses the next whole-second boundary. Clients showing
//! a countdown or clock then update in step with simulated seconds instead
//! of drifting against them.

use std::time::Duration;

/// Floor for the adaptive delay. Also the fallback when simulated time
/// moves backwards (scenario restart): the schedule degrades to plain
/// interval polling instead of stalling or going negative.
pub const MIN_SYNC_DELAY: Duration = Duration::from_millis(50);

/// Margin past the second boundary so the pushed snapshot is taken on the
/// far side of the tick.
const BOUNDARY_MARGIN_MS: u64 = 20;

/// Compute the delay until the next sync push.
///
/// `last_time_ms` is the simulated time observed at the push just sent, or
/// `None` when no scenario is loaded (plain `base` interval then). The
/// result is always within `[MIN_SYNC_DELAY, base]`.
pub fn next_sync_delay(last_time_ms: Option<i64>, base: Duration) -> Duration {
    let base = base.max(MIN_SYNC_DELAY);
    let time_ms = match last_time_ms {
        Some(t) if t >= 0 => t as u64,
        _ => return base,
    };

    let to_boundary = 1000 - (time_ms % 1000) + BOUNDARY_MARGIN_MS;
    Duration::from_millis(to_boundary).clamp(MIN_SYNC_DELAY, base)
}
