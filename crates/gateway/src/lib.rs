//! HTTP gateway for Concierge.
//!
//! Routes:
//! - `POST /api/chat` with `{userId?, message}` answers `{reply}`
//! - `GET /health` answers `{status, version}`
//!
//! Every response carries permissive CORS headers. Unknown routes answer
//! `404 Not found`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::{Router, routing::get, routing::post};
use concierge_agent::{ConversationOrchestrator, CycleError};
use concierge_core::message::ChatRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<ConversationOrchestrator>,

    /// Conversation id used when a request carries no `userId`
    pub default_user_id: String,

    /// Maximum accepted request body size in bytes
    pub body_limit_bytes: usize,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self {
            orchestrator,
            default_user_id: "demo-user".into(),
            body_limit_bytes: 64 * 1024,
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the router with all gateway routes and layers.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state.body_limit_bytes;

    Router::new()
        .route("/api/chat", post(chat_handler).options(preflight_handler))
        .route("/health", get(health_handler).options(preflight_handler))
        .fallback(fallback_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: concierge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let orchestrator = concierge_agent::build_orchestrator(&config).await?;
    let state = Arc::new(GatewayState {
        orchestrator: Arc::new(orchestrator),
        default_user_id: config.gateway.default_user_id.clone(),
        body_limit_bytes: config.gateway.body_limit_bytes,
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(rename = "userId", default)]
    user_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// A dropped connection drops this future, which abandons the cycle before
/// anything is persisted.
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(JsonRejection::BytesRejection(rejection)) => {
            let status = rejection.status();
            warn!(status = %status, reason = %rejection.body_text(), "Could not read chat body");
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "request body too large"
            } else {
                "could not read request body"
            };
            return error_response(status, message);
        }
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected chat body");
            return error_response(StatusCode::BAD_REQUEST, "invalid JSON body");
        }
    };

    let user_id = body
        .user_id
        .unwrap_or_else(|| state.default_user_id.clone());
    let request = ChatRequest::new(user_id, body.message.unwrap_or_default());

    match state.orchestrator.handle(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(CycleError::Validation(message)) => error_response(StatusCode::BAD_REQUEST, message),
        Err(e @ CycleError::Store(_)) => {
            warn!(user_id = %request.user_id, error = %e, "Chat cycle failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "session store unavailable")
        }
        Err(CycleError::Cancelled) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "request cancelled")
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

async fn fallback_handler(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use concierge_agent::LlmClient;
    use concierge_core::error::{ProviderError, SessionError};
    use concierge_core::message::{ConversationId, Turn};
    use concierge_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use concierge_core::session::SessionStore;
    use concierge_memory::{InMemorySessionStore, NoopMemoryIndex};
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedProvider;

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: "Hi from the model".into(),
                model: request.model,
                usage: None,
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn load(&self, _id: &ConversationId) -> Result<Vec<Turn>, SessionError> {
            Err(SessionError::Storage("disk on fire".into()))
        }

        async fn save(
            &self,
            _id: &ConversationId,
            _turns: &[Turn],
            _retention: Duration,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn app_with_store(sessions: Arc<dyn SessionStore>) -> Router {
        let orchestrator = ConversationOrchestrator::new(
            sessions,
            Arc::new(NoopMemoryIndex),
            LlmClient::new(Arc::new(FixedProvider), "test-model"),
        );
        build_router(Arc::new(GatewayState::new(Arc::new(orchestrator))))
    }

    fn app() -> (Router, Arc<InMemorySessionStore>) {
        let sessions = Arc::new(InMemorySessionStore::new());
        (app_with_store(sessions.clone()), sessions)
    }

    fn chat(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn chat_returns_reply_and_persists() {
        let (app, sessions) = app();
        let response = app
            .oneshot(chat(r#"{"userId":"u1","message":"Hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let json = json_body(response).await;
        assert_eq!(json["reply"], "Hi from the model");

        let stored = sessions.load(&ConversationId::from("u1")).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn missing_user_id_uses_default() {
        let (app, sessions) = app();
        let response = app.oneshot(chat(r#"{"message":"Hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = sessions
            .load(&ConversationId::from("demo-user"))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let (app, sessions) = app();
        let response = app
            .oneshot(chat(r#"{"userId":"u1","message":"   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "message required");
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn missing_message_is_bad_request() {
        let (app, _) = app();
        let response = app.oneshot(chat(r#"{"userId":"u1"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, sessions) = app();
        let response = app.oneshot(chat("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid JSON body");
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn oversized_body_is_payload_too_large() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let orchestrator = ConversationOrchestrator::new(
            sessions.clone(),
            Arc::new(NoopMemoryIndex),
            LlmClient::new(Arc::new(FixedProvider), "test-model"),
        );
        let mut state = GatewayState::new(Arc::new(orchestrator));
        state.body_limit_bytes = 64;
        let app = build_router(Arc::new(state));

        let body = format!(r#"{{"userId":"u1","message":"{}"}}"#, "a".repeat(500));
        let response = app.oneshot(chat(&body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["error"], "request body too large");
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn store_failure_is_server_error() {
        let app = app_with_store(Arc::new(BrokenStore));
        let response = app
            .oneshot(chat(r#"{"userId":"u1","message":"Hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert!(!json["error"].as_str().unwrap().contains("disk on fire"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("access-control-allow-origin"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Not found");
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/chat")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));
    }

    #[tokio::test]
    async fn bare_options_on_unknown_path_is_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
