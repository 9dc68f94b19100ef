//! Route configuration and setup

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Json, Router,
};
use rota_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::constants::{API_PREFIX, OPENAPI_PATH};
use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Request bodies here are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route("/auth/signup", post(handlers::auth::sign_up))
        .route("/auth/signin", post(handlers::auth::sign_in))
        .route("/auth/signout", post(handlers::auth::sign_out))
        .route(
            "/auth/user",
            get(handlers::auth::current_user).patch(handlers::auth::update_user),
        )
        .route("/companies", post(handlers::companies::create_company))
        .route("/companies/{company_id}", get(handlers::companies::get_company))
        .route(
            "/companies/{company_id}/members",
            get(handlers::companies::list_members),
        )
        .route(
            "/companies/{company_id}/invitations",
            post(handlers::companies::create_invitation)
                .get(handlers::companies::list_invitations),
        )
        .route(
            "/invitations/mine",
            get(handlers::invitations::my_invitations),
        )
        .route(
            "/invitations/{invitation_id}",
            delete(handlers::invitations::cancel_invitation),
        )
        .route(
            "/invitations/{invitation_id}/message",
            patch(handlers::invitations::update_message),
        )
        .route(
            "/invitations/{invitation_id}/extend",
            post(handlers::invitations::extend_invitation),
        )
        .route("/events", get(handlers::events::invitation_events));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/join",
            get(handlers::join::join_page).post(handlers::join::join_company),
        )
        .nest(API_PREFIX, api)
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(3600))
    };
    Ok(cors)
}
