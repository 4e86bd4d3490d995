//! Sliding-window rate limiting.
//!
//! Counts admitted requests per client inside the trailing window
//! `(now - window, now]`. A client may burst up to `limit` requests at once;
//! after that nothing is admitted until the oldest entry ages out. Rejected
//! attempts are not recorded, so hammering does not extend the lockout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::governance::{ClientKey, Decision, PipelineState, Rejection, RequestContext, Stage};
use crate::observability::metrics;
use crate::routing::PathScope;
use crate::security::store::{RecordStore, ShardedStore};

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admit,
    Reject { retry_after: u64 },
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    store: Arc<dyn RecordStore>,
    limit: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(limit: u32, window_seconds: u64) -> Self {
        Self::with_store(limit, window_seconds, Arc::new(ShardedStore::new()))
    }

    pub fn with_store(limit: u32, window_seconds: u64, store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            limit: limit as usize,
            window: Duration::from_secs(window_seconds),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request from `key` arriving at `now`.
    pub fn admit(&self, key: &ClientKey, now: Instant) -> RateDecision {
        let mut decision = RateDecision::Admit;
        let (limit, window) = (self.limit, self.window);

        self.store.with_record(key, &mut |record| {
            record.prune(now, window);
            if record.len() >= limit {
                decision = RateDecision::Reject {
                    retry_after: window.as_secs(),
                };
            } else {
                record.push(now);
            }
        });

        decision
    }

    /// Drop records whose timestamps have all expired. Returns how many
    /// records remain.
    pub fn purge_idle(&self, now: Instant) -> usize {
        let window = self.window;
        self.store.retain(&mut |record| {
            record.prune(now, window);
            !record.is_empty()
        });
        let remaining = self.store.len();
        metrics::record_tracked_clients(remaining);
        remaining
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

/// Pipeline stage applying the limiter to in-scope paths.
#[derive(Debug)]
pub struct RateLimitStage {
    limiter: Arc<SlidingWindowLimiter>,
    scope: PathScope,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, scope: PathScope) -> Self {
        Self { limiter, scope }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn checkpoint(&self) -> PipelineState {
        PipelineState::RateChecked
    }

    fn evaluate(&self, ctx: &RequestContext) -> Decision {
        if !self.scope.contains(&ctx.path) {
            return Decision::Continue;
        }

        match self.limiter.admit(&ctx.client, ctx.arrived_at) {
            RateDecision::Admit => Decision::Continue,
            RateDecision::Reject { retry_after } => {
                tracing::warn!(
                    client = %ctx.client,
                    path = %ctx.path,
                    limit = self.limiter.limit(),
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited();
                Decision::Reject(Rejection::too_many_requests(
                    format!(
                        "Rate limit exceeded: at most {} requests per {} seconds",
                        self.limiter.limit(),
                        self.limiter.window().as_secs()
                    ),
                    retry_after,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::store::GlobalLockStore;
    use std::thread;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_rejects_after_limit_and_recovers() {
        let limiter = SlidingWindowLimiter::new(5, 60);
        let key = ClientKey::from("1.2.3.4");
        let t0 = Instant::now();

        for i in 0..5 {
            assert_eq!(limiter.admit(&key, t0 + secs(i)), RateDecision::Admit);
        }
        assert_eq!(
            limiter.admit(&key, t0 + secs(10)),
            RateDecision::Reject { retry_after: 60 }
        );
        assert_eq!(limiter.admit(&key, t0 + secs(61)), RateDecision::Admit);
    }

    #[test]
    fn test_exact_boundary_is_expired() {
        let limiter = SlidingWindowLimiter::new(1, 60);
        let key = ClientKey::from("k");
        let t0 = Instant::now();

        assert_eq!(limiter.admit(&key, t0), RateDecision::Admit);
        assert!(matches!(limiter.admit(&key, t0 + Duration::from_millis(59_999)), RateDecision::Reject { .. }));
        assert_eq!(limiter.admit(&key, t0 + secs(60)), RateDecision::Admit);
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = SlidingWindowLimiter::new(2, 10);
        let key = ClientKey::from("k");
        let t0 = Instant::now();

        limiter.admit(&key, t0);
        limiter.admit(&key, t0 + secs(1));
        for i in 2..9 {
            assert!(matches!(limiter.admit(&key, t0 + secs(i)), RateDecision::Reject { .. }));
        }
        // Only the first admission has aged out at t=10.
        assert_eq!(limiter.admit(&key, t0 + secs(10)), RateDecision::Admit);
        assert!(matches!(limiter.admit(&key, t0 + secs(10)), RateDecision::Reject { .. }));
    }

    #[test]
    fn test_out_of_order_admissions_still_expire() {
        let limiter = SlidingWindowLimiter::new(3, 60);
        let key = ClientKey::from("1.2.3.4");
        let t0 = Instant::now();

        // The later stamp wins the race to the record.
        assert_eq!(limiter.admit(&key, t0 + secs(5)), RateDecision::Admit);
        assert_eq!(limiter.admit(&key, t0), RateDecision::Admit);

        // Only t0+5 is still inside the window at t0+60.
        assert_eq!(limiter.admit(&key, t0 + secs(60)), RateDecision::Admit);
        assert_eq!(limiter.admit(&key, t0 + secs(60)), RateDecision::Admit);
        assert_eq!(
            limiter.admit(&key, t0 + secs(60)),
            RateDecision::Reject { retry_after: 60 }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, 60);
        let now = Instant::now();

        assert_eq!(limiter.admit(&ClientKey::from("a"), now), RateDecision::Admit);
        assert_eq!(limiter.admit(&ClientKey::from("b"), now), RateDecision::Admit);
        assert!(matches!(limiter.admit(&ClientKey::from("a"), now), RateDecision::Reject { .. }));
    }

    #[test]
    fn test_purge_idle_drops_expired_records() {
        let limiter = SlidingWindowLimiter::new(5, 60);
        let t0 = Instant::now();
        limiter.admit(&ClientKey::from("old"), t0);
        limiter.admit(&ClientKey::from("new"), t0 + secs(30));
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.purge_idle(t0 + secs(60)), 1);
        assert_eq!(limiter.purge_idle(t0 + secs(90)), 0);
    }

    fn concurrent_admissions(store: Arc<dyn RecordStore>) -> usize {
        let limiter = Arc::new(SlidingWindowLimiter::with_store(5, 60, store));
        let now = Instant::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || limiter.admit(&ClientKey::from("same"), now))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| *d == RateDecision::Admit)
            .count()
    }

    #[test]
    fn test_no_over_admission_under_contention() {
        assert_eq!(concurrent_admissions(Arc::new(ShardedStore::new())), 5);
        assert_eq!(concurrent_admissions(Arc::new(GlobalLockStore::new())), 5);
    }
}
