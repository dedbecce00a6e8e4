use std::time::Duration;

use axum::handler::Handler;
use axum::http::{HeaderName, Method};
use axum::routing::get;
use axum::Router;
use qamoos_core::DictConfigSnapshot;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AxumApp {
    pub config: DictConfigSnapshot,
    pub router: Router<()>,
}

impl AxumApp {
    pub fn new(config: DictConfigSnapshot) -> Self {
        Self {
            config,
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    pub fn service<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.use_get(path, handler)
    }

    /// Tracing, request ids and CORS. Call once, after every route is mounted.
    pub fn with_http_layers(mut self) -> Self {
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
        let max_age = self
            .config
            .get_duration("http.cors.max_age")
            .unwrap_or(Duration::from_secs(600));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
            .max_age(max_age);

        self.router = self
            .router
            .layer(cors)
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum(config: DictConfigSnapshot) -> AxumApp {
    AxumApp::new(config)
}
