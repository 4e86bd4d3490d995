//! The governance pipeline.
//!
//! # State Transitions
//! ```text
//! Start → Logged                      (always; the audit line never blocks)
//! Logged → TemporalChecked            temporal gate passes
//! TemporalChecked → RateChecked       rate gate passes
//! RateChecked → Authorized            role gate passes
//! Authorized → Dispatched             handler runs, its response is returned as is
//! any gate → Rejected                 pipeline answers, handler never runs
//! ```
//!
//! Disabled gates are skipped. The order is fixed by the builder, not by the
//! order of calls on it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::config::{ConfigError, GovernorConfig, StoreKind};
use crate::config::validation::{validate_config, ValidationError};
use crate::governance::clock::{Clock, SystemClock};
use crate::governance::context::{Identity, RequestContext};
use crate::governance::decision::{Decision, PipelineState, Rejection, Stage};
use crate::observability::audit::RequestAuditLogger;
use crate::observability::metrics;
use crate::routing::PathScope;
use crate::security::{
    AccessWindow, AuthorizationRule, ClientIdentifier, GlobalLockStore, RateLimitStage,
    RecordStore, RoleAuthorizer, ShardedStore, SlidingWindowLimiter, TemporalAccessPolicy,
};

/// Final outcome of running every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Dispatch,
    Rejected {
        stage: &'static str,
        /// Last state the request reached before the rejecting stage.
        reached: PipelineState,
        rejection: Rejection,
    },
}

#[derive(Debug)]
pub struct GovernancePipeline {
    audit: Option<RequestAuditLogger>,
    stages: Vec<Box<dyn Stage>>,
    identifier: ClientIdentifier,
    clock: Arc<dyn Clock>,
    limiter: Option<Arc<SlidingWindowLimiter>>,
}

impl GovernancePipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Build the pipeline a configuration describes, on the system clock.
    pub fn from_config(config: &GovernorConfig) -> Result<Self, ConfigError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn from_config_with_clock(
        config: &GovernorConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let forwarded = config.client.forwarded_header.parse().map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidHeaderName(
                config.client.forwarded_header.clone(),
            )])
        })?;
        let mut builder = Self::builder()
            .clock(clock)
            .identifier(ClientIdentifier::new(forwarded));

        if config.audit.enabled {
            builder = builder.audit(RequestAuditLogger::from_config(&config.audit));
        }

        if config.temporal.enabled {
            let temporal = &config.temporal;
            builder = builder.temporal(TemporalAccessPolicy::new(AccessWindow::new(
                temporal.allowed_start,
                temporal.allowed_end,
                PathScope::from_config(&temporal.scoped_paths),
            )));
        }

        if config.rate_limit.enabled {
            let rate = &config.rate_limit;
            let store: Arc<dyn RecordStore> = match rate.store {
                StoreKind::Sharded => Arc::new(ShardedStore::new()),
                StoreKind::GlobalLock => Arc::new(GlobalLockStore::new()),
            };
            let limiter = SlidingWindowLimiter::with_store(rate.max_requests, rate.window_seconds, store);
            builder = builder.rate_limit(RateLimitStage::new(
                Arc::new(limiter),
                PathScope::from_config(&rate.scoped_paths),
            ));
        }

        if config.authz.enabled {
            let authz = &config.authz;
            // Methods were checked by validation; anything unparsable was rejected there.
            let methods = authz
                .guarded_methods
                .iter()
                .filter_map(|m| m.trim().to_ascii_uppercase().parse().ok());
            let roles = authz
                .allowed_roles
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            builder = builder.authorization(RoleAuthorizer::new(vec![AuthorizationRule::new(
                PathScope::from_config(&authz.protected_paths),
                methods,
                roles,
            )]));
        }

        Ok(builder.build())
    }

    /// Names of the active stages, in evaluation order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let audit = self.audit.as_ref().map(|_| "audit");
        audit
            .into_iter()
            .chain(self.stages.iter().map(|s| s.name()))
            .collect()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn limiter(&self) -> Option<&Arc<SlidingWindowLimiter>> {
        self.limiter.as_ref()
    }

    /// Describe an HTTP request for the stages, stamped with the current time.
    ///
    /// The identity comes from the request extensions, where an upstream
    /// authentication layer is expected to have put it.
    pub fn context_for<B>(&self, request: &Request<B>, peer: Option<SocketAddr>) -> RequestContext {
        let client = self.identifier.identify_socket(request.headers(), peer);
        let mut ctx = RequestContext::new(
            request.method().clone(),
            request.uri().path(),
            client,
            self.clock.now(),
            self.clock.local_now(),
        );
        if let Some(identity) = request.extensions().get::<Identity>() {
            ctx = ctx.with_identity(identity.clone());
        }
        ctx
    }

    /// Run the audit line and every gate for one request.
    pub fn evaluate(&self, ctx: &RequestContext) -> Verdict {
        if let Some(audit) = &self.audit {
            audit.record_request(ctx);
        }
        let mut state = PipelineState::Logged;

        for stage in &self.stages {
            match stage.evaluate(ctx) {
                Decision::Continue => {
                    state = stage.checkpoint();
                    tracing::debug!(
                        request_id = %ctx.request_id,
                        stage = stage.name(),
                        state = ?state,
                        "Stage passed"
                    );
                }
                Decision::Reject(rejection) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        client = %ctx.client,
                        method = %ctx.method,
                        path = %ctx.path,
                        stage = stage.name(),
                        status = rejection.status.as_u16(),
                        "Request rejected"
                    );
                    metrics::record_rejected(stage.name());
                    return Verdict::Rejected {
                        stage: stage.name(),
                        reached: state,
                        rejection,
                    };
                }
            }
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            state = ?PipelineState::Dispatched,
            "Dispatching to handler"
        );
        metrics::record_dispatched();
        Verdict::Dispatch
    }

    /// Govern one request and, if it passes, hand it to `handler`.
    pub fn handle<H, R>(&self, ctx: RequestContext, handler: H) -> Response
    where
        H: FnOnce(RequestContext) -> R,
        R: IntoResponse,
    {
        match self.evaluate(&ctx) {
            Verdict::Dispatch => handler(ctx).into_response(),
            Verdict::Rejected { rejection, .. } => rejection.into_response(),
        }
    }

    /// Drop idle rate-limit records. Returns the number still tracked.
    pub fn purge_idle(&self) -> Option<usize> {
        self.limiter
            .as_ref()
            .map(|limiter| limiter.purge_idle(self.clock.now()))
    }
}

/// Assembles a pipeline. Gates always run audit → temporal → rate limit →
/// authorization, followed by any extra stages in insertion order.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    audit: Option<RequestAuditLogger>,
    temporal: Option<TemporalAccessPolicy>,
    rate_limit: Option<RateLimitStage>,
    authorization: Option<RoleAuthorizer>,
    extra: Vec<Box<dyn Stage>>,
    identifier: Option<ClientIdentifier>,
    clock: Option<Arc<dyn Clock>>,
}

impl PipelineBuilder {
    pub fn audit(mut self, logger: RequestAuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    pub fn temporal(mut self, policy: TemporalAccessPolicy) -> Self {
        self.temporal = Some(policy);
        self
    }

    pub fn rate_limit(mut self, stage: RateLimitStage) -> Self {
        self.rate_limit = Some(stage);
        self
    }

    pub fn authorization(mut self, authorizer: RoleAuthorizer) -> Self {
        self.authorization = Some(authorizer);
        self
    }

    /// Append a custom gate after the built-in ones.
    pub fn stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.extra.push(stage);
        self
    }

    pub fn identifier(mut self, identifier: ClientIdentifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> GovernancePipeline {
        let limiter = self.rate_limit.as_ref().map(|s| s.limiter().clone());

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if let Some(temporal) = self.temporal {
            stages.push(Box::new(temporal));
        }
        if let Some(rate_limit) = self.rate_limit {
            stages.push(Box::new(rate_limit));
        }
        if let Some(authorization) = self.authorization {
            stages.push(Box::new(authorization));
        }
        stages.extend(self.extra);

        GovernancePipeline {
            audit: self.audit,
            stages,
            identifier: self.identifier.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            limiter,
        }
    }
}
