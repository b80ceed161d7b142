use axum::{
    extract::State,
    http::{Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::messaging::broadcast::{BroadcastService, SEND_COOLDOWN};
use crate::messaging::cooldown::SendCooldown;
use crate::messaging::twilio::TwilioSender;
use crate::messaging::SmsSender;
use crate::services::auth_service;
use crate::web::{
    error::AppError,
    models::{LoginRequest, SignupRequest, UserResponse},
    routes::{category_routes, contact_routes, dashboard_routes, sms_routes},
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ServerConfig>,
    pub broadcast: Arc<BroadcastService>,
}

async fn signup_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::register_user(&app_state.db, payload).await?;
    let token = auth_service::issue_session_token(&user, &app_state.config.jwt_secret)?;
    let jar = jar.add(auth_service::session_cookie(token));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::login_user(&app_state.db, payload).await?;
    let token = auth_service::issue_session_token(&user, &app_state.config.jwt_secret)?;
    let jar = jar.add(auth_service::session_cookie(token));

    Ok((
        jar,
        Json(UserResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

async fn logout_handler(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(auth_service::clear_session_cookie());
    (jar, Json(serde_json::json!({ "success": true })))
}

pub fn create_router(db: DatabaseConnection, config: Arc<ServerConfig>) -> Router {
    let sender: Arc<dyn SmsSender> = Arc::new(TwilioSender::new(config.clone()));
    let broadcast = Arc::new(BroadcastService::new(
        db.clone(),
        sender,
        SendCooldown::new(SEND_COOLDOWN),
    ));

    let app_state = Arc::new(AppState {
        db,
        config,
        broadcast,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let session_layer =
        axum_middleware::from_fn_with_state(app_state.clone(), middleware::auth::auth);

    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .nest(
            "/categories",
            category_routes::router().route_layer(session_layer.clone()),
        )
        .nest(
            "/contacts",
            contact_routes::router().route_layer(session_layer.clone()),
        )
        .nest(
            "/dashboard",
            dashboard_routes::router().route_layer(session_layer.clone()),
        )
        .nest(
            "/sms",
            sms_routes::router()
                .route_layer(session_layer)
                .merge(sms_routes::webhook_router()),
        )
        .layer(axum_middleware::from_fn(middleware::guard::route_guard))
        .with_state(app_state)
        .layer(cors)
}
