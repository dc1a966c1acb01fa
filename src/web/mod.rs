use axum::{
    Json, Router,
    extract::State,
    http::Method,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::store::{InstanceStore, UserStore};
use crate::instance_api::InstanceApiClient;
use crate::orchestrator::Orchestrator;
use crate::server::config::ServerConfig;
use crate::services::auth_service;
use crate::web::{
    models::{LoginRequest, RegisterRequest},
    routes::{agent_routes, callback_routes},
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub instances: Arc<dyn InstanceStore>,
    pub users: Arc<dyn UserStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub instance_api: Arc<InstanceApiClient>,
    pub config: Arc<ServerConfig>,
}

async fn register_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<models::UserResponse>, AppError> {
    let user_response = auth_service::register_user(&app_state.users, payload).await?;
    Ok(Json(user_response))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let login_response =
        auth_service::login_user(&app_state.users, payload, &app_state.config.jwt_secret).await?;

    let auth_cookie = Cookie::build(("token", login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(true)
        .build();

    let mut response = Json(login_response).into_response();
    if let Ok(header_value) = auth_cookie.to_string().parse() {
        response
            .headers_mut()
            .insert(axum::http::header::SET_COOKIE, header_value);
    }

    Ok(response)
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .nest(
            "/api/agent",
            agent_routes::agent_router().route_layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                middleware::auth::auth,
            )),
        )
        // Callback routes are reachable without operator credentials; the
        // instance identifies itself by service id.
        .nest("/api/callbacks", callback_routes::callback_router())
        .with_state(app_state)
        .layer(cors)
}
