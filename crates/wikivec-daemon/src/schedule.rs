//! Scheduling policy: which crawl, if any, is due at a given instant.
//!
//! Pure functions over `RunState` and the clock, so the policy can be
//! tested with fabricated timestamps instead of real waits.

use chrono::{DateTime, Duration, Utc};
use wikivec_core::config::ScheduleConfig;
use wikivec_core::types::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FullDue,
    IncrementalDue,
}

/// Returns the most urgent trigger, full refresh winning over an
/// incremental check when both are due.
pub fn due(run_state: &RunState, now: DateTime<Utc>, cfg: &ScheduleConfig) -> Option<Trigger> {
    if full_due(run_state, now, cfg) {
        return Some(Trigger::FullDue);
    }
    if incremental_due(run_state, now, cfg) {
        return Some(Trigger::IncrementalDue);
    }
    None
}

/// A full refresh is due when none has ever run, the long interval
/// elapsed, or the daily boundary was crossed since the last one.
pub fn full_due(run_state: &RunState, now: DateTime<Utc>, cfg: &ScheduleConfig) -> bool {
    let Some(last) = run_state.last_full else {
        return true;
    };
    if now - last >= Duration::hours(cfg.full_hours as i64) {
        return true;
    }
    cfg.midnight_refresh && now.date_naive() > last.date_naive()
}

fn incremental_due(run_state: &RunState, now: DateTime<Utc>, cfg: &ScheduleConfig) -> bool {
    let Some(last) = run_state.last_incremental else {
        return true;
    };
    now - last >= Duration::minutes(cfg.incremental_minutes as i64)
}
