use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use storefront::{
    domain::repositories::orders::OrderRepository,
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::orders::OrderPostgres},
    payments::stripe_client::StripeClient,
};

use crate::{
    axum_http::error_responses::AppError,
    usecases::{payments::StripeGateway, stripe_webhook::StripeWebhookUseCase},
};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let order_repository = OrderPostgres::new(Arc::clone(&db_pool));
    let usecase = StripeWebhookUseCase::new(Arc::new(order_repository), stripe_client);

    router(Arc::new(usecase))
}

pub fn router<O, G>(usecase: Arc<StripeWebhookUseCase<O, G>>) -> Router
where
    O: OrderRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/stripe", post(stripe_webhook))
        .route("/test", get(test_endpoint))
        .with_state(usecase)
}

/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn stripe_webhook<O, G>(
    State(usecase): State<Arc<StripeWebhookUseCase<O, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match usecase.handle_stripe_webhook(&body, signature).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn test_endpoint() -> impl IntoResponse {
    Json(json!({
        "message": "Webhook endpoint is reachable",
        "timestamp": Utc::now(),
    }))
}
