//! HTTP wiring for resource handlers
//!
//! Each builder returns a stateless [`Router`] ready to be nested under the
//! resource's base path:
//!
//! ```rust,ignore
//! let tours = Arc::new(tours::handlers(&collections, options.clone()));
//! let app = Router::new().nest(
//!     "/api/v1/tours",
//!     collection_routes(tours.clone(), renderer, &ApiOperation::RESOURCE)
//!         .merge(alias_route(tours, renderer, tours::top_five_cheap())),
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde_json::Value;

use super::envelope::ResourceEnvelope;
use super::error::{ApiError, ApiOperation};
use super::factory::{RequestContext, ResourceHandlers};
use super::render::ErrorRenderer;
use super::sanitize::sanitize_body;
use crate::query::{QueryAlias, QuerySpec};
use crate::repository::{Document, DocumentStore};

struct RouteState<S> {
    handlers: Arc<ResourceHandlers<S>>,
    renderer: ErrorRenderer,
    alias: Option<Arc<QueryAlias>>,
}

impl<S> Clone for RouteState<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            renderer: self.renderer,
            alias: self.alias.clone(),
        }
    }
}

impl<S: DocumentStore + 'static> RouteState<S> {
    fn new(handlers: Arc<ResourceHandlers<S>>, renderer: ErrorRenderer) -> Self {
        Self {
            handlers,
            renderer,
            alias: None,
        }
    }

    fn context(&self, params: HashMap<String, String>, raw_query: Option<String>) -> RequestContext {
        let mut query = QuerySpec::parse(raw_query.as_deref().unwrap_or_default(), self.handlers.policy());
        if let Some(alias) = &self.alias {
            query = query.with_alias(alias);
        }
        RequestContext::new().with_params(params).with_query(query)
    }

    /// Nested routes capture the parent id as `id`; hand it to the handlers
    /// under the parent parameter's name.
    fn parent_params(&self, mut params: HashMap<String, String>) -> HashMap<String, String> {
        if let Some(scope) = self.handlers.parent() {
            if let Some(id) = params.remove("id") {
                params.insert(scope.param.clone(), id);
            }
        }
        params
    }

    fn respond(&self, result: Result<ResourceEnvelope, ApiError>) -> Response {
        match result {
            Ok(envelope) => envelope.into_response(),
            Err(err) => self.renderer.render(&err),
        }
    }
}

fn read_body(body: Result<Json<Value>, JsonRejection>, operation: ApiOperation) -> Result<Document, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(sanitize_body(map)),
        Ok(Json(_)) => Err(ApiError::malformed_body(operation, "request body must be a JSON object")),
        Err(rejection) => Err(ApiError::malformed_body(operation, rejection.body_text())),
    }
}

async fn list_root<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let ctx = state.context(HashMap::new(), raw);
    state.respond(state.handlers.list(&ctx).await)
}

async fn list_nested<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    Path(params): Path<HashMap<String, String>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let ctx = state.context(state.parent_params(params), raw);
    state.respond(state.handlers.list(&ctx).await)
}

async fn create_root<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let result = match read_body(body, ApiOperation::Create) {
        Ok(body) => {
            let ctx = RequestContext::new().with_body(body);
            state.handlers.create_one(&ctx).await
        }
        Err(err) => Err(err),
    };
    state.respond(result)
}

async fn create_nested<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    Path(params): Path<HashMap<String, String>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let result = match read_body(body, ApiOperation::Create) {
        Ok(body) => {
            let ctx = RequestContext::new()
                .with_params(state.parent_params(params))
                .with_body(body);
            state.handlers.create_one(&ctx).await
        }
        Err(err) => Err(err),
    };
    state.respond(result)
}

async fn get_item<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    Path(params): Path<HashMap<String, String>>,
) -> Response {
    let ctx = RequestContext::new().with_params(params);
    state.respond(state.handlers.get_one(&ctx).await)
}

async fn update_item<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    Path(params): Path<HashMap<String, String>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let result = match read_body(body, ApiOperation::Update) {
        Ok(body) => {
            let ctx = RequestContext::new().with_params(params).with_body(body);
            state.handlers.update_one(&ctx).await
        }
        Err(err) => Err(err),
    };
    state.respond(result)
}

async fn delete_item<S: DocumentStore + 'static>(
    State(state): State<RouteState<S>>,
    Path(params): Path<HashMap<String, String>>,
) -> Response {
    let ctx = RequestContext::new().with_params(params);
    state.respond(state.handlers.delete_one(&ctx).await)
}

/// Mount `/` (list, create) and `/{id}` (get, update, delete), limited to
/// `operations`.
pub fn collection_routes<S>(
    handlers: Arc<ResourceHandlers<S>>,
    renderer: ErrorRenderer,
    operations: &[ApiOperation],
) -> Router
where
    S: DocumentStore + 'static,
{
    let mut root: MethodRouter<RouteState<S>> = MethodRouter::new();
    let mut item: MethodRouter<RouteState<S>> = MethodRouter::new();
    for operation in operations {
        match operation {
            ApiOperation::List => root = root.get(list_root::<S>),
            ApiOperation::Create => root = root.post(create_root::<S>),
            ApiOperation::Get => item = item.get(get_item::<S>),
            ApiOperation::Update => item = item.patch(update_item::<S>),
            ApiOperation::Delete => item = item.delete(delete_item::<S>),
            ApiOperation::Route | ApiOperation::Report => {}
        }
    }

    Router::new()
        .route("/", root)
        .route("/{id}", item)
        .with_state(RouteState::new(handlers, renderer))
}

/// Mount list and create for a child resource at `/{id}/<segment>`, where
/// `id` is the parent's id.
pub fn nested_collection_routes<S>(handlers: Arc<ResourceHandlers<S>>, renderer: ErrorRenderer, segment: &str) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            &format!("/{{id}}/{segment}"),
            get(list_nested::<S>).post(create_nested::<S>),
        )
        .with_state(RouteState::new(handlers, renderer))
}

/// Mount a preset list query at `/<alias name>`.
pub fn alias_route<S>(handlers: Arc<ResourceHandlers<S>>, renderer: ErrorRenderer, alias: QueryAlias) -> Router
where
    S: DocumentStore + 'static,
{
    let path = format!("/{}", alias.name());
    let state = RouteState {
        alias: Some(Arc::new(alias)),
        ..RouteState::new(handlers, renderer)
    };
    Router::new().route(&path, get(list_root::<S>)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{FieldRule, MemoryCollection, MemoryDatabase, Schema};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn handlers() -> Arc<ResourceHandlers<MemoryCollection>> {
        let db = MemoryDatabase::new();
        let store = db.register(
            Schema::new("bookings", "booking").field(FieldRule::number("price").required("Booking must have a price.")),
        );
        Arc::new(ResourceHandlers::new("bookings", store))
    }

    async fn call(router: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_failure() {
        let router = collection_routes(handlers(), ErrorRenderer::production(), &ApiOperation::RESOURCE);
        let (status, body) = call(router, Method::POST, "/", Some("{\"price\": ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!("fail"));
        assert!(body["message"].as_str().unwrap().starts_with("Invalid input data : "));
    }

    #[tokio::test]
    async fn test_operation_subset() {
        let router = collection_routes(handlers(), ErrorRenderer::production(), &[ApiOperation::List]);
        let (status, _) = call(router.clone(), Method::POST, "/", Some("{\"price\": 1}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, body) = call(router, Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "success", "results": 0, "data": { "data": [] } }));
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let router = collection_routes(handlers(), ErrorRenderer::development(), &ApiOperation::RESOURCE);
        let (status, body) = call(router.clone(), Method::POST, "/", Some("{\"price\": 497}")).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["data"]["_id"].as_str().unwrap().to_string();

        let (status, body) = call(router.clone(), Method::PATCH, &format!("/{id}"), Some("{\"price\": 397}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["data"]["price"], json!(397));

        let (status, _) = call(router.clone(), Method::DELETE, &format!("/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(router, Method::GET, &format!("/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], json!("not_found"));
    }
}
