//! Verb router: one entry point per path that dispatches GET/POST/PUT/DELETE to
//! optionally registered handlers.

use crate::error::AppError;
use axum::{
    body::Bytes,
    extract::{Query, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Methods a path can register handlers for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 4] = [Verb::Get, Verb::Post, Verb::Put, Verb::Delete];

    pub fn from_method(method: &Method) -> Option<Self> {
        match method.as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// What a handler sees of the request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn new(method: Method) -> Self {
        ApiRequest {
            method,
            query: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Buffer the body and parse the query string. An unparsable query is treated as empty.
    pub async fn from_request(req: Request) -> Result<Self, AppError> {
        let (parts, body) = req.into_parts();
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|_| AppError::invalid_body())?;
        Ok(ApiRequest {
            method: parts.method,
            query,
            body,
        })
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
pub type Handler = Arc<dyn Fn(ApiRequest) -> HandlerFuture + Send + Sync>;

/// Box an async closure as a `Handler`.
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: ApiRequest| -> HandlerFuture { Box::pin(f(req)) })
}

/// Up to four handlers for one path. Missing entries answer 405.
#[derive(Clone, Default)]
pub struct VerbTable {
    handlers: HashMap<Verb, Handler>,
}

impl VerbTable {
    pub fn new() -> Self {
        VerbTable::default()
    }

    pub fn on(mut self, verb: Verb, h: Handler) -> Self {
        self.handlers.insert(verb, h);
        self
    }

    pub fn get(self, h: Handler) -> Self {
        self.on(Verb::Get, h)
    }

    pub fn post(self, h: Handler) -> Self {
        self.on(Verb::Post, h)
    }

    pub fn put(self, h: Handler) -> Self {
        self.on(Verb::Put, h)
    }

    pub fn delete(self, h: Handler) -> Self {
        self.on(Verb::Delete, h)
    }

    pub fn handler(&self, verb: Verb) -> Option<&Handler> {
        self.handlers.get(&verb)
    }

    /// Registered verbs in GET, POST, PUT, DELETE order.
    pub fn verbs(&self) -> Vec<Verb> {
        Verb::ALL
            .into_iter()
            .filter(|v| self.handlers.contains_key(v))
            .collect()
    }
}

impl fmt::Debug for VerbTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerbTable").field("verbs", &self.verbs()).finish()
    }
}

/// OPTIONS answers 200 with no body before any lookup. The handler's response is returned as-is.
pub async fn dispatch(table: &VerbTable, req: ApiRequest) -> Response {
    if req.method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    let Some(verb) = Verb::from_method(&req.method) else {
        return AppError::MethodNotAllowed("Method not allowed".into()).into_response();
    };
    match table.handler(verb) {
        Some(h) => h(req).await,
        None => AppError::MethodNotAllowed(format!("{} method not allowed", verb)).into_response(),
    }
}

/// Path → verb table. Registering a path again replaces its table.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, VerbTable>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    pub fn register(&mut self, path: impl Into<String>, table: VerbTable) -> Option<VerbTable> {
        self.routes.insert(path.into(), table)
    }

    pub fn get(&self, path: &str) -> Option<&VerbTable> {
        self.routes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VerbTable)> {
        self.routes.iter().map(|(p, t)| (p.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// One axum route per path, every method funnelled through `dispatch`.
    pub fn into_router(self) -> Router {
        self.routes.into_iter().fold(Router::new(), |router, (path, table)| {
            let table = Arc::new(table);
            router.route(
                &path,
                any(move |req: Request| {
                    let table = table.clone();
                    async move {
                        match ApiRequest::from_request(req).await {
                            Ok(req) => dispatch(&table, req).await,
                            Err(e) => e.into_response(),
                        }
                    }
                }),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>, status: StatusCode) -> Handler {
        let counter = counter.clone();
        handler(move |_req| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                status.into_response()
            }
        })
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn each_verb_invokes_only_its_handler() {
        let counters: Vec<Arc<AtomicUsize>> = (0..4).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let table = Verb::ALL
            .into_iter()
            .zip(&counters)
            .fold(VerbTable::new(), |t, (v, c)| t.on(v, counting(c, StatusCode::OK)));

        for (i, method) in [Method::GET, Method::POST, Method::PUT, Method::DELETE].into_iter().enumerate() {
            let resp = dispatch(&table, ApiRequest::new(method)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            for (j, c) in counters.iter().enumerate() {
                let expected = if j <= i { 1 } else { 0 };
                assert_eq!(c.load(Ordering::SeqCst), expected);
            }
        }
    }

    #[tokio::test]
    async fn missing_handler_is_405_and_invokes_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = VerbTable::new()
            .get(counting(&calls, StatusCode::OK))
            .post(counting(&calls, StatusCode::CREATED));
        let resp = dispatch(&table, ApiRequest::new(Method::DELETE)).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(resp).await, r#"{"error":"DELETE method not allowed"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn options_is_empty_200_regardless_of_registrations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let full = Verb::ALL
            .into_iter()
            .fold(VerbTable::new(), |t, v| t.on(v, counting(&calls, StatusCode::OK)));
        for table in [VerbTable::new(), full] {
            let resp = dispatch(&table, ApiRequest::new(Method::OPTIONS)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(body_string(resp).await, "");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_table_rejects_every_verb() {
        let table = VerbTable::new();
        for verb in Verb::ALL {
            let method = Method::from_bytes(verb.to_string().as_bytes()).unwrap();
            let resp = dispatch(&table, ApiRequest::new(method)).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body_string(resp).await, format!(r#"{{"error":"{} method not allowed"}}"#, verb));
        }
    }

    #[tokio::test]
    async fn unknown_method_is_generic_405() {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = VerbTable::new().get(counting(&calls, StatusCode::OK));
        let resp = dispatch(&table, ApiRequest::new(Method::PATCH)).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_string(resp).await, r#"{"error":"Method not allowed"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_response_passes_through() {
        let table = VerbTable::new().put(handler(|req: ApiRequest| async move {
            let id = req.query.get("id").cloned().unwrap_or_default();
            (StatusCode::ACCEPTED, format!("{}:{}", id, req.body.len())).into_response()
        }));
        let req = ApiRequest::new(Method::PUT).with_query("id", "7").with_body("abc");
        let resp = dispatch(&table, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(resp).await, "7:3");
    }

    #[test]
    fn register_replaces_previous_table() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut routes = RouteTable::new();
        assert!(routes
            .register("/api/x", VerbTable::new().get(counting(&calls, StatusCode::OK)))
            .is_none());
        let previous = routes
            .register("/api/x", VerbTable::new().delete(counting(&calls, StatusCode::OK)))
            .unwrap();
        assert_eq!(previous.verbs(), vec![Verb::Get]);
        assert_eq!(routes.get("/api/x").unwrap().verbs(), vec![Verb::Delete]);
        assert_eq!(routes.len(), 1);
    }
}
