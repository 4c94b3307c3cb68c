use std::sync::Arc;

use axum::http::StatusCode;
use storefront::{
    domain::{
        repositories::orders::OrderRepository,
        value_objects::{
            orders::ReconcileOutcome, payment_transitions::PaymentOutcome, payments::WebhookAck,
        },
    },
    payments::stripe_client::StripeClient,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{axum_http::error_responses::AppError, usecases::payments::StripeGateway};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing Stripe-Signature header")]
    MissingSignature,
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("webhook payload is not a valid event")]
    InvalidPayload,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::InvalidPayload => StatusCode::BAD_REQUEST,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Internal(inner) => AppError::Internal(inner),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, WebhookError>;

pub struct StripeWebhookUseCase<O, G>
where
    O: OrderRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    stripe_client: Arc<G>,
}

impl<O, G> StripeWebhookUseCase<O, G>
where
    O: OrderRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(order_repo: Arc<O>, stripe_client: Arc<G>) -> Self {
        Self {
            order_repo,
            stripe_client,
        }
    }

    /// Verifies and applies one provider delivery. Errors are returned only when
    /// the provider should see a failure (bad request or a retryable 500).
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<WebhookAck> {
        let signature = signature
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                warn!("webhooks: stripe delivery without signature header");
                WebhookError::MissingSignature
            })?;

        self.stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(
                    error = %err,
                    status = WebhookError::InvalidSignature.status_code().as_u16(),
                    "webhooks: stripe signature verification failed"
                );
                WebhookError::InvalidSignature
            })?;

        let event = StripeClient::parse_event(payload).map_err(|err| {
            warn!(error = %err, "webhooks: verified payload is not a stripe event");
            WebhookError::InvalidPayload
        })?;

        let event_type = event.type_.clone();
        info!(event_id = ?event.id, %event_type, "webhooks: stripe event verified");

        let ack = WebhookAck {
            received: true,
            event_type: event_type.clone(),
        };

        let Some(outcome) = PaymentOutcome::from_event_type(&event_type) else {
            debug!(%event_type, "webhooks: unhandled stripe event type");
            return Ok(ack);
        };

        let Some(payment_intent_id) = event.payment_intent_id() else {
            warn!(%event_type, event_id = ?event.id, "webhooks: event carries no payment intent id");
            return Ok(ack);
        };

        let result = self
            .order_repo
            .reconcile_payment(payment_intent_id.clone(), outcome)
            .await
            .map_err(|err| {
                error!(
                    %payment_intent_id,
                    %event_type,
                    db_error = ?err,
                    "webhooks: failed to reconcile payment"
                );
                WebhookError::Internal(err)
            })?;

        match result {
            ReconcileOutcome::OrderNotFound => {
                warn!(%payment_intent_id, %event_type, "webhooks: no order for payment intent");
            }
            ReconcileOutcome::AlreadyApplied { order_id } => {
                info!(%order_id, %payment_intent_id, %event_type, "webhooks: duplicate delivery skipped");
            }
            ReconcileOutcome::Stale { order_id, current } => {
                warn!(
                    %order_id,
                    %payment_intent_id,
                    %event_type,
                    current_payment_status = %current.payment_status,
                    current_status = %current.status,
                    "webhooks: stale transition skipped"
                );
            }
            ReconcileOutcome::Applied { order_id, from, to } => {
                info!(
                    %order_id,
                    %payment_intent_id,
                    %event_type,
                    from_payment_status = %from.payment_status,
                    to_payment_status = %to.payment_status,
                    to_status = %to.status,
                    "webhooks: order payment reconciled"
                );
            }
        }

        Ok(ack)
    }
}
