//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the messaging handlers
//! - Wire up middleware (request ID, tracing, timeout, identity, gate)
//! - Bind server to listener
//! - Swap in a rebuilt gate pipeline on config reload

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::setup_api_router;
use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::messaging::{InMemoryStore, MessageService, MessageStore};
use crate::observability::{LogSink, RequestLogger};
use crate::pipeline::{gate_middleware, identity_middleware, GateState, RequestPipeline};
use crate::security::ClientWindows;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub messages: MessageService,
}

/// Collaborators the server is built from.
pub struct Dependencies {
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn MessageStore>,
    /// `None` leaves the logger stage out of the pipeline.
    pub log_sink: Option<Arc<dyn LogSink>>,
}

impl Default for Dependencies {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            store: Arc::new(InMemoryStore::new()),
            log_sink: None,
        }
    }
}

/// HTTP server for the chat gate.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: GateState,
    windows: ClientWindows,
    logger: Option<RequestLogger>,
}

impl HttpServer {
    pub fn new(config: GateConfig, deps: Dependencies) -> Self {
        let windows = ClientWindows::new();
        let logger = deps.log_sink.map(RequestLogger::new);

        let pipeline = RequestPipeline::from_config(&config, windows.clone(), logger.clone());
        tracing::info!(stages = ?pipeline.stage_names(), "Gate pipeline built");
        let gate = GateState::new(pipeline, deps.clock.clone());

        let state = AppState {
            messages: MessageService::new(deps.store, deps.clock),
        };

        let router = Self::build_router(&config, state, gate.clone());
        Self {
            router,
            config,
            gate,
            windows,
            logger,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState, gate: GateState) -> Router {
        setup_api_router(state)
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(middleware::from_fn(identity_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run until `shutdown` fires, applying configs received on `config_updates`.
    ///
    /// Only the gate pipeline is rebuilt on reload; listener and timeout
    /// changes need a restart. Rate-limit windows carry over.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let gate = self.gate.clone();
        let windows = self.windows.clone();
        let logger = self.logger.clone();
        let running = self.config.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                if new_config.listener.bind_address != running.listener.bind_address
                    || new_config.timeouts.request_secs != running.timeouts.request_secs
                {
                    tracing::warn!("Listener and timeout changes take effect after a restart");
                }
                let pipeline = RequestPipeline::from_config(&new_config, windows.clone(), logger.clone());
                tracing::info!(stages = ?pipeline.stage_names(), "Gate pipeline reloaded");
                gate.replace(pipeline);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Rate-limit state shared by every pipeline this server builds.
    pub fn windows(&self) -> &ClientWindows {
        &self.windows
    }

    pub fn gate(&self) -> &GateState {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observability::MemorySink;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    fn server(config: GateConfig, sink: Arc<MemorySink>) -> HttpServer {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 9, 9).unwrap().and_hms_opt(19, 0, 0).unwrap(),
        );
        HttpServer::new(
            config,
            Dependencies {
                clock: Arc::new(clock),
                store: Arc::new(InMemoryStore::new()),
                log_sink: Some(sink),
            },
        )
    }

    fn post_message(user: &str, role: &str) -> Request<Body> {
        Request::post("/api/messages")
            .header("content-type", "application/json")
            .header("x-user-id", user)
            .header("x-user-role", role)
            .header("x-forwarded-for", "203.0.113.5")
            .body(Body::from(r#"{"receiver":"bob","body":"hi"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_router_applies_gate_and_request_id() {
        let sink = Arc::new(MemorySink::new());
        let server = server(GateConfig::default(), sink.clone());

        let res = server.router.clone().oneshot(post_message("alice", "admin")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(res.headers().contains_key("x-request-id"));

        let res = server.router.clone().oneshot(post_message("gus", "guest")).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        assert_eq!(sink.lines().len(), 2);
        assert_eq!(server.windows().snapshot("203.0.113.5").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_logged_and_404() {
        let sink = Arc::new(MemorySink::new());
        let server = server(GateConfig::default(), sink.clone());
        let res = server
            .router
            .clone()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(sink.lines()[0].ends_with("User: Anonymous - Path: /nope"));
    }

    #[tokio::test]
    async fn test_replaced_pipeline_takes_effect() {
        let sink = Arc::new(MemorySink::new());
        let server = server(GateConfig::default(), sink);

        let mut open = GateConfig::default();
        open.roles.enabled = false;
        server
            .gate()
            .replace(RequestPipeline::from_config(&open, server.windows().clone(), None));

        let res = server.router.clone().oneshot(post_message("gus", "guest")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }
}
