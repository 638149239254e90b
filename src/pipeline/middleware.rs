//! Axum adapters for the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::clock::Clock;
use crate::http::request::{GateRequest, Principal};
use crate::observability::metrics;
use crate::pipeline::RequestPipeline;

/// State shared by the gate middleware.
///
/// The pipeline sits behind `ArcSwap` so a config reload can replace it
/// while requests are in flight.
#[derive(Clone)]
pub struct GateState {
    pub pipeline: Arc<ArcSwap<RequestPipeline>>,
    pub clock: Arc<dyn Clock>,
}

impl GateState {
    pub fn new(pipeline: RequestPipeline, clock: Arc<dyn Clock>) -> Self {
        Self {
            pipeline: Arc::new(ArcSwap::from_pointee(pipeline)),
            clock,
        }
    }

    pub fn replace(&self, pipeline: RequestPipeline) {
        self.pipeline.store(Arc::new(pipeline));
    }
}

/// Attach the [`Principal`] named by the identity headers, if any.
pub async fn identity_middleware(mut req: Request<Body>, next: Next) -> Response {
    if let Some(principal) = Principal::from_headers(req.headers()) {
        req.extensions_mut().insert(principal);
    }
    next.run(req).await
}

/// Run the pipeline in front of the rest of the router.
pub async fn gate_middleware(
    State(state): State<GateState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let gate_req = GateRequest::from_http(&request, peer, state.clock.now());

    let pipeline = state.pipeline.load_full();
    let response = match pipeline.run(&gate_req, || next.run(request)).await {
        Ok(decision) => decision.into_response(),
        Err(e) => {
            tracing::error!(error = %e, path = %gate_req.path, "Gate stage failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal gate error").into_response()
        }
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
