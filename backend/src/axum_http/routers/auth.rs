use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use storefront::{
    domain::{
        repositories::users::UserRepository,
        value_objects::iam::{LoginRequest, RegisterRequest},
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
};
use tracing::info;

use crate::{
    auth::{Argon2PasswordHasher, AuthUser, SharedTokenAuthority},
    axum_http::error_responses::AppError,
    usecases::auth::AuthUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, token_authority: SharedTokenAuthority) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let usecase = AuthUseCase::new(
        Arc::new(user_repository),
        Arc::new(Argon2PasswordHasher),
        token_authority,
    );

    router(Arc::new(usecase))
}

pub fn router<U>(usecase: Arc<AuthUseCase<U>>) -> Router
where
    U: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(usecase)
}

pub async fn register<U>(
    State(usecase): State<Arc<AuthUseCase<U>>>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.register(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn login<U>(
    State(usecase): State<Arc<AuthUseCase<U>>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.login(request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn logout(AuthUser { user_id, .. }: AuthUser) -> impl IntoResponse {
    info!(%user_id, "auth: logout requested");
    Json(json!({ "message": "Logged out successfully" }))
}

pub async fn me<U>(
    State(usecase): State<Arc<AuthUseCase<U>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    match usecase.current_user(user_id).await {
        Ok(user) => Json(user).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
