//! HTTP surface over the session store and client operations.

pub mod error;
pub mod handlers;

use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::session::SessionStore;
use crate::upstream::ClientHandle;
use error::ApiError;

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
}

/// Client handle resolved from the `X-Auth-Token` header.
pub struct Authenticated(pub Arc<ClientHandle>);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = auth_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication token required"))?;
        let handle = state
            .sessions
            .resolve(token)
            .map_err(|_| ApiError::unauthorized("Invalid authentication token"))?;
        Ok(Self(handle))
    }
}

pub(crate) fn auth_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/workitems",
            get(handlers::list_work_items).post(handlers::create_work_item),
        )
        .route("/workitems/{id}", patch(handlers::update_work_item))
        .route(
            "/workitems/{id}/relations",
            get(handlers::get_relations).post(handlers::add_relation),
        )
        .route(
            "/workitems/{id}/relations/{index}",
            delete(handlers::remove_relation),
        )
        .route("/areapaths", get(handlers::list_area_paths));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ORIGIN,
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
            HeaderName::from_static(AUTH_TOKEN_HEADER),
        ])
}
