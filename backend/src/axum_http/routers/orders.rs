use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use storefront::{
    domain::{
        repositories::orders::OrderRepository,
        value_objects::orders::{
            PlaceOrderRequest, UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
        },
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::orders::OrderPostgres},
};
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::orders::OrderUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let order_repository = OrderPostgres::new(Arc::clone(&db_pool));
    let usecase = OrderUseCase::new(Arc::new(order_repository));

    router(Arc::new(usecase))
}

pub fn router<O>(usecase: Arc<OrderUseCase<O>>) -> Router
where
    O: OrderRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_status))
        .route("/:id/payment-status", put(update_payment_status))
        .with_state(usecase)
}

pub async fn place_order<O>(
    State(usecase): State<Arc<OrderUseCase<O>>>,
    AuthUser { user_id, .. }: AuthUser,
    body: Bytes,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
{
    let request = match parse_place_order_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match usecase.place_order(user_id, request).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

/// An empty body places the order without a payment intent.
fn parse_place_order_body(body: &[u8]) -> Result<PlaceOrderRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PlaceOrderRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid order request body: {err}")))
}

pub async fn list_orders<O>(
    State(usecase): State<Arc<OrderUseCase<O>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
{
    match usecase.list_orders(user_id).await {
        Ok(orders) => Json(orders).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn get_order<O>(
    State(usecase): State<Arc<OrderUseCase<O>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(order_id): Path<Uuid>,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
{
    match usecase.get_order(user_id, order_id).await {
        Ok(order) => Json(order).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_status<O>(
    State(usecase): State<Arc<OrderUseCase<O>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
{
    match usecase.update_status(user_id, order_id, request).await {
        Ok(order) => Json(order).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_payment_status<O>(
    State(usecase): State<Arc<OrderUseCase<O>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> impl IntoResponse
where
    O: OrderRepository + Send + Sync + 'static,
{
    match usecase
        .update_payment_status(user_id, order_id, request)
        .await
    {
        Ok(order) => Json(order).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
