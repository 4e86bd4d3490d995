//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap an application Router with the governance middleware
//! - Wire up tower-http middleware (tracing, timeout)
//! - Serve with peer addresses available to client identification
//! - Run the idle-record purge for the rate limiter
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ConfigError, GovernorConfig};
use crate::governance::GovernancePipeline;
use crate::http::middleware::governance_middleware;

/// HTTP server putting the governance pipeline in front of an application.
pub struct HttpServer {
    router: Router,
    config: GovernorConfig,
    pipeline: Arc<GovernancePipeline>,
}

impl HttpServer {
    /// Build the pipeline from `config` and wrap `app` with it.
    pub fn new(config: GovernorConfig, app: Router) -> Result<Self, ConfigError> {
        let pipeline = Arc::new(GovernancePipeline::from_config(&config)?);
        Ok(Self::with_pipeline(config, pipeline, app))
    }

    /// Wrap `app` with an already built pipeline.
    pub fn with_pipeline(config: GovernorConfig, pipeline: Arc<GovernancePipeline>, app: Router) -> Self {
        let router = Self::build_router(&config, pipeline.clone(), app);
        Self {
            router,
            config,
            pipeline,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GovernorConfig, pipeline: Arc<GovernancePipeline>, app: Router) -> Router {
        app.layer(middleware::from_fn_with_state(pipeline, governance_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// The governed router, for driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pipeline(&self) -> &Arc<GovernancePipeline> {
        &self.pipeline
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Run the server until the shutdown broadcast fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            stages = ?self.pipeline.stage_names(),
            "HTTP server starting"
        );

        if self.pipeline.limiter().is_some() {
            spawn_purge_task(
                self.pipeline.clone(),
                Duration::from_secs(self.config.rate_limit.purge_interval_secs),
                shutdown.resubscribe(),
            );
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn spawn_purge_task(
    pipeline: Arc<GovernancePipeline>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(tracked) = pipeline.purge_idle() {
                        tracing::debug!(tracked_clients = tracked, "Purged idle rate-limit records");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}
