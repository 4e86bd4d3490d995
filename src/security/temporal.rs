//! Time-of-day access gating.
//!
//! Only hour, minute and second are compared, so the same window applies
//! every day. Both ends are inclusive. A window whose end is earlier than its
//! start spans midnight: 22:00–02:00 admits 23:30 and 01:00.

use std::fmt;

use chrono::{NaiveTime, Timelike};

use crate::governance::{Decision, PipelineState, Rejection, RequestContext, Stage};
use crate::routing::PathScope;

/// Allowed daily interval plus the paths it governs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub scope: PathScope,
}

impl AccessWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, scope: PathScope) -> Self {
        Self { start, end, scope }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// True if `time` falls inside the window, at second resolution.
    pub fn allows(&self, time: NaiveTime) -> bool {
        let time = time.with_nanosecond(0).unwrap_or(time);
        if self.wraps_midnight() {
            time >= self.start || time <= self.end
        } else {
            self.start <= time && time <= self.end
        }
    }
}

impl fmt::Display for AccessWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M:%S"), self.end.format("%H:%M:%S"))
    }
}

#[derive(Debug, Clone)]
pub struct TemporalAccessPolicy {
    window: AccessWindow,
}

impl TemporalAccessPolicy {
    pub fn new(window: AccessWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &AccessWindow {
        &self.window
    }

    pub fn evaluate_at(&self, path: &str, time_of_day: NaiveTime) -> Decision {
        if !self.window.scope.contains(path) || self.window.allows(time_of_day) {
            return Decision::Continue;
        }
        Decision::Reject(Rejection::forbidden(format!(
            "Access restricted to window {}",
            self.window
        )))
    }
}

impl Stage for TemporalAccessPolicy {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn checkpoint(&self) -> PipelineState {
        PipelineState::TemporalChecked
    }

    fn evaluate(&self, ctx: &RequestContext) -> Decision {
        self.evaluate_at(&ctx.path, ctx.local_time.time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn policy(start: NaiveTime, end: NaiveTime) -> TemporalAccessPolicy {
        TemporalAccessPolicy::new(AccessWindow::new(
            start,
            end,
            PathScope::from_config(&["/api/conversations/"]),
        ))
    }

    #[test]
    fn test_inclusive_window() {
        let policy = policy(hms(18, 0, 0), hms(21, 0, 0));
        let path = "/api/conversations/";

        assert!(!policy.evaluate_at(path, hms(17, 59, 0)).is_continue());
        assert!(policy.evaluate_at(path, hms(18, 0, 0)).is_continue());
        assert!(policy.evaluate_at(path, hms(21, 0, 0)).is_continue());
        assert!(!policy.evaluate_at(path, hms(21, 1, 0)).is_continue());
    }

    #[test]
    fn test_sub_second_precision_is_ignored() {
        let policy = policy(hms(18, 0, 0), hms(21, 0, 0));
        let almost = NaiveTime::from_hms_milli_opt(21, 0, 0, 999).unwrap();
        assert!(policy.evaluate_at("/api/conversations/", almost).is_continue());
    }

    #[test]
    fn test_rejection_is_forbidden() {
        let policy = policy(hms(18, 0, 0), hms(21, 0, 0));
        match policy.evaluate_at("/api/conversations/1", hms(3, 0, 0)) {
            Decision::Reject(rejection) => {
                assert_eq!(rejection.status, axum::http::StatusCode::FORBIDDEN);
                assert!(rejection.message.contains("18:00:00-21:00:00"));
                assert_eq!(rejection.retry_after, None);
            }
            Decision::Continue => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_out_of_scope_paths_pass() {
        let policy = policy(hms(18, 0, 0), hms(21, 0, 0));
        assert!(policy.evaluate_at("/health", hms(3, 0, 0)).is_continue());
    }

    #[test]
    fn test_window_spanning_midnight() {
        let policy = policy(hms(22, 0, 0), hms(2, 0, 0));
        let path = "/api/conversations/";

        assert!(policy.evaluate_at(path, hms(23, 30, 0)).is_continue());
        assert!(policy.evaluate_at(path, hms(0, 0, 0)).is_continue());
        assert!(policy.evaluate_at(path, hms(2, 0, 0)).is_continue());
        assert!(!policy.evaluate_at(path, hms(12, 0, 0)).is_continue());
    }
}
