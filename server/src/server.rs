use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use steward_core::{Steward, Store};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::routes;

/// The full application: every route under `/api`, with request tracing and CORS.
pub fn router(steward: Steward, allow_origins: &[String]) -> Result<Router> {
    let origins = allow_origins.iter().map(|origin| HeaderValue::from_str(origin)).collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new().nest("/api", routes::api()).with_state(steward).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(cors)
            .into_inner(),
    ))
}

pub struct Server {
    bind_address: String,
    app: Router,
}

impl Server {
    pub fn builder() -> ServerBuilder { ServerBuilder::default() }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, self.app).with_graceful_shutdown(shutdown_signal()).await?;

        info!("server stopped");
        Ok(())
    }
}

#[derive(Default)]
pub struct ServerBuilder {
    bind_address: Option<String>,
    allow_origins: Vec<String>,
    store: Option<Arc<dyn Store>>,
}

impl ServerBuilder {
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.bind_address = Some(addr.into());
        self
    }

    pub fn allow_origins(mut self, origins: impl IntoIterator<Item = String>) -> Self {
        self.allow_origins.extend(origins);
        self
    }

    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn build(self) -> Result<Server> {
        let bind_address = self.bind_address.ok_or_else(|| anyhow::anyhow!("bind_address is required"))?;
        let store = self.store.ok_or_else(|| anyhow::anyhow!("store is required"))?;

        let app = router(Steward::new(store), &self.allow_origins)?;
        Ok(Server { bind_address, app })
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
