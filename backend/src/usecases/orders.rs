use std::sync::Arc;

use axum::http::StatusCode;
use storefront::domain::{
    repositories::orders::OrderRepository,
    value_objects::{
        enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
        orders::{
            ManualPaymentOutcome, OrderDto, PlaceOrderOutcome, PlaceOrderRequest,
            UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("product {0} in the cart no longer exists")]
    MissingProduct(Uuid),
    #[error("payment intent is already attached to another order")]
    DuplicatePaymentIntent,
    #[error("order not found")]
    NotFound,
    #[error("invalid order status: {0}")]
    InvalidStatus(String),
    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),
    #[error("order already has a different payment intent")]
    PaymentIntentConflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::EmptyCart
            | OrderError::MissingProduct(_)
            | OrderError::DuplicatePaymentIntent
            | OrderError::InvalidStatus(_)
            | OrderError::InvalidPaymentStatus(_)
            | OrderError::PaymentIntentConflict => StatusCode::BAD_REQUEST,
            OrderError::NotFound => StatusCode::NOT_FOUND,
            OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => AppError::NotFound(err.to_string()),
            OrderError::Internal(inner) => AppError::Internal(inner),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, OrderError>;

pub struct OrderUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
}

impl<O> OrderUseCase<O>
where
    O: OrderRepository + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<O>) -> Self {
        Self { order_repo }
    }

    pub async fn place_order(
        &self,
        user_id: Uuid,
        request: PlaceOrderRequest,
    ) -> UseCaseResult<OrderDto> {
        info!(%user_id, "orders: placing order from cart");

        let outcome = self
            .order_repo
            .place_order(user_id, request.payment_intent_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "orders: place order transaction failed");
                OrderError::Internal(err)
            })?;

        match outcome {
            PlaceOrderOutcome::Placed(details) => {
                let dto = OrderDto::from(details);
                info!(
                    %user_id,
                    order_id = %dto.order_id,
                    total_minor = dto.total_amount_minor,
                    items = dto.items.len(),
                    "orders: order placed"
                );
                Ok(dto)
            }
            PlaceOrderOutcome::EmptyCart => {
                warn!(%user_id, "orders: rejected order from empty cart");
                Err(OrderError::EmptyCart)
            }
            PlaceOrderOutcome::MissingProduct(product_id) => {
                warn!(%user_id, %product_id, "orders: rejected order with missing product");
                Err(OrderError::MissingProduct(product_id))
            }
            PlaceOrderOutcome::DuplicatePaymentIntent => {
                warn!(%user_id, "orders: payment intent already used by another order");
                Err(OrderError::DuplicatePaymentIntent)
            }
        }
    }

    pub async fn list_orders(&self, user_id: Uuid) -> UseCaseResult<Vec<OrderDto>> {
        let orders = self.order_repo.list_for_user(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "orders: failed to list orders");
            OrderError::Internal(err)
        })?;

        Ok(orders.into_iter().map(OrderDto::from).collect())
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> UseCaseResult<OrderDto> {
        let order = self
            .order_repo
            .find_for_user(order_id, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, %order_id, db_error = ?err, "orders: failed to load order");
                OrderError::Internal(err)
            })?;

        order.map(OrderDto::from).ok_or(OrderError::NotFound)
    }

    pub async fn update_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        request: UpdateOrderStatusRequest,
    ) -> UseCaseResult<OrderDto> {
        let status = OrderStatus::from_str(&request.status)
            .ok_or_else(|| OrderError::InvalidStatus(request.status.clone()))?;

        let updated = self
            .order_repo
            .update_status(order_id, user_id, status)
            .await
            .map_err(|err| {
                error!(%user_id, %order_id, db_error = ?err, "orders: failed to update status");
                OrderError::Internal(err)
            })?;

        let details = updated.ok_or(OrderError::NotFound)?;
        info!(%user_id, %order_id, %status, "orders: status updated manually");

        Ok(OrderDto::from(details))
    }

    pub async fn update_payment_status(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        request: UpdatePaymentStatusRequest,
    ) -> UseCaseResult<OrderDto> {
        let payment_status = PaymentStatus::from_str(&request.payment_status)
            .ok_or_else(|| OrderError::InvalidPaymentStatus(request.payment_status.clone()))?;

        let outcome = self
            .order_repo
            .update_payment_status(order_id, user_id, payment_status, request.payment_intent_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %order_id,
                    db_error = ?err,
                    "orders: failed to update payment status"
                );
                OrderError::Internal(err)
            })?;

        match outcome {
            ManualPaymentOutcome::Updated(details) => {
                info!(
                    %user_id,
                    %order_id,
                    %payment_status,
                    status = %details.order.status,
                    "orders: payment status updated manually"
                );
                Ok(OrderDto::from(details))
            }
            ManualPaymentOutcome::NotFound => Err(OrderError::NotFound),
            ManualPaymentOutcome::IntentConflict => {
                warn!(%user_id, %order_id, "orders: payment intent conflict on manual update");
                Err(OrderError::PaymentIntentConflict)
            }
        }
    }
}
