//! HTTP API.
//!
//! Login endpoints under `/api/v1/pub` plus the Prometheus `/metrics`
//! endpoint. Every route except `POST /login` passes through
//! [`require_auth`], which validates the bearer token and stores the
//! [`CurrentUser`] in the request extensions.

use crate::error::AuthError;
use crate::login::{LoginService, UserLoginInfo};
use crate::permission::MenuTree;
use crate::telemetry::{spans, token_fingerprint};
use crate::token::TokenInfo;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Instrument, error};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginService>,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub subject_id: String,
    pub view: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginParam {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordParam {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MenuTreeList {
    pub list: Vec<MenuTree>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "Request failed");
        }
        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

fn status_ok() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate the bearer token and attach [`CurrentUser`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let span = spans::request(req.method().as_str(), req.uri().path());
    async move {
        let token = bearer_token(&req).ok_or(AuthError::InvalidToken)?.to_string();
        let (subject_id, view) = state.login.tokens().validate(&token).await?;

        tracing::Span::current().record("subject", subject_id.as_str());
        tracing::debug!(token = %token_fingerprint(&token), "Bearer accepted");

        req.extensions_mut().insert(CurrentUser {
            subject_id,
            view,
            token,
        });
        Ok(next.run(req).await)
    }
    .instrument(span)
    .await
}

async fn login(
    State(state): State<AppState>,
    Json(param): Json<LoginParam>,
) -> Result<Json<TokenInfo>, AuthError> {
    let span = spans::login(&param.username);
    async move {
        if param.username.is_empty() {
            return Err(AuthError::InvalidUser);
        }
        let (_, token) = state
            .login
            .login(&param.username, &param.password, param.view.as_deref())
            .await?;
        Ok(Json(token))
    }
    .instrument(span)
    .await
}

async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, AuthError> {
    state.login.logout(&user.token).await?;
    Ok(status_ok())
}

async fn refresh_token(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<TokenInfo>, AuthError> {
    let token = state
        .login
        .refresh_token(&user.subject_id, &user.view)
        .await?;
    Ok(Json(token))
}

async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserLoginInfo>, AuthError> {
    Ok(Json(state.login.login_info(&user.subject_id).await?))
}

async fn current_menu_tree(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<MenuTreeList>, AuthError> {
    let list = state.login.menu_tree(&user.subject_id).await?;
    Ok(Json(MenuTreeList { list }))
}

async fn update_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(param): Json<UpdatePasswordParam>,
) -> Result<Json<serde_json::Value>, AuthError> {
    state
        .login
        .change_password(&user.subject_id, &param.old_password, &param.new_password)
        .await?;
    Ok(status_ok())
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Build the application router.
pub fn router(state: AppState, with_metrics: bool) -> Router {
    let protected = Router::new()
        .route("/login/exit", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/current/user", get(current_user))
        .route("/current/menutree", get(current_menu_tree))
        .route("/current/password", put(update_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new().route("/login", post(login)).merge(protected);

    let mut app = Router::new().nest("/api/v1/pub", api);
    if with_metrics {
        app = app.route("/metrics", get(metrics_handler));
    }
    app.with_state(state)
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
