//! # Ingress
//!
//! `HttpIngress` owns the listener and the route table. Each connection is
//! served by hyper's `http1` builder; each request runs inside a `Webhook`
//! span carrying a fresh request id.
//!
//! ```rust,ignore
//! HttpIngress::new(controller)
//!     .bind("0.0.0.0:3000")
//!     .public_base_url(Some("https://ivr.example.com".into()))
//!     .run_until(tokio::signal::ctrl_c())
//!     .await?;
//! ```

use crate::request::{decode_pairs, external_base_url, route_path};
use bytes::Bytes;
use callflow_core::config::{DEFAULT_BIND, Mode};
use callflow_guard::SIGNATURE_HEADER;
use callflow_runtime::{WebhookController, WebhookReply, WebhookRequest, WebhookRoute};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::Instrument;

/// Carrier webhooks are small forms; anything larger is not from the carrier.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub const HEALTH_PATH: &str = "/health";

const XML: &str = callflow_voice::twiml::CONTENT_TYPE;
const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Error, Debug)]
pub enum IngressError {
    #[error("invalid bind address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("listener failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Webhook(WebhookRoute),
    Health,
}

/// HTTP ingress for carrier webhooks.
#[derive(Clone)]
pub struct HttpIngress {
    /// Bind address (e.g., "127.0.0.1:3000")
    addr: Option<String>,
    public_base_url: Option<String>,
    mode: Mode,
    /// Routes: (Method, Path) -> Route
    routes: Arc<HashMap<(Method, String), Route>>,
    controller: WebhookController,
}

impl HttpIngress {
    pub fn new(controller: WebhookController) -> Self {
        let mut routes = HashMap::new();
        for route in WebhookRoute::ALL {
            routes.insert((Method::POST, route.path().to_string()), Route::Webhook(route));
        }
        routes.insert((Method::GET, HEALTH_PATH.to_string()), Route::Health);

        Self {
            addr: None,
            public_base_url: None,
            mode: Mode::default(),
            routes: Arc::new(routes),
            controller,
        }
    }

    /// Set the bind address for the server.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Origin the carrier signs against; reconstructed per request if `None`.
    pub fn public_base_url(mut self, url: Option<String>) -> Self {
        self.public_base_url = url;
        self
    }

    /// Reported by the health endpoint.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Run until the process is killed.
    pub async fn run(self) -> Result<(), IngressError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Accept connections until `shutdown` resolves. In-flight connections
    /// are left to finish on their own tasks.
    pub async fn run_until<S>(self, shutdown: S) -> Result<(), IngressError>
    where
        S: Future + Send,
    {
        let addr_str = self.addr.clone().unwrap_or_else(|| DEFAULT_BIND.to_string());
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|source| IngressError::InvalidAddr {
                addr: addr_str.clone(),
                source,
            })?;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Callflow HTTP Ingress listening on http://{}", addr);

        let ingress = Arc::new(self);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested; no longer accepting connections");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let ingress = ingress.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let ingress = ingress.clone();
                    async move { Ok::<_, Infallible>(ingress.dispatch(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!(%peer, "Error serving connection: {:?}", err);
                }
            });
        }
    }

    /// Route and answer one request. Generic over the body so it can be
    /// driven without a socket.
    pub async fn dispatch<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!(
            "Webhook",
            http.method = %method,
            http.path = %path,
            request_id = %request_id,
            call_sid = tracing::field::Empty,
            step = tracing::field::Empty,
        );

        async move {
            let key = (method, route_path(&path).to_string());
            let response = match self.routes.get(&key).copied() {
                Some(Route::Webhook(route)) => self.webhook(route, req).await,
                Some(Route::Health) => self.health(),
                None => respond(StatusCode::NOT_FOUND, TEXT, "Not Found"),
            };
            tracing::debug!(status = response.status().as_u16(), "response");
            response
        }
        .instrument(span)
        .await
    }

    async fn webhook<B>(&self, route: WebhookRoute, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let raw = match Limited::new(body, MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::warn!(error = %err, "unreadable webhook body");
                return respond(StatusCode::PAYLOAD_TOO_LARGE, TEXT, "Payload Too Large");
            }
        };

        let base_url = external_base_url(self.public_base_url.as_deref(), &parts.headers);
        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or(route.path(), |pq| pq.as_str());
        let query = parts
            .uri
            .query()
            .map(|q| decode_pairs(q.as_bytes()))
            .unwrap_or_default();
        let signature = parts
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let request = WebhookRequest {
            route,
            url: format!("{base_url}{path_and_query}"),
            base_url,
            signature,
            query,
            body: decode_pairs(&raw),
        };

        let span = tracing::Span::current();
        let params = request.params();
        let field = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        if let Some(call_sid) = field(callflow_core::turn::fields::CALL_SID) {
            span.record("call_sid", call_sid);
        }
        if let Some(step) = field(callflow_core::turn::STEP_PARAM) {
            span.record("step", step);
        }

        match self.controller.handle(request).await {
            WebhookReply::Unauthorized => respond(StatusCode::UNAUTHORIZED, TEXT, Bytes::new()),
            reply => respond(StatusCode::OK, XML, reply.into_body()),
        }
    }

    fn health(&self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "status": "ok",
            "mode": self.mode,
            "signature_policy": self.controller.guard().policy(),
        });
        respond(StatusCode::OK, JSON, body.to_string())
    }
}

fn respond(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
