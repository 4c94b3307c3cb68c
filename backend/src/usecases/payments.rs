use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use axum::http::StatusCode;
use storefront::{
    domain::value_objects::payments::{
        ConfirmPaymentRequest, CreatePaymentIntentRequest, NewPaymentIntent, PaymentIntentDto,
        PaymentIntentModel, PaymentStatusDto, PublishableKeyDto, is_payment_intent_id,
    },
    payments::stripe_client::{StripeClient, WebhookSignatureError},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> AnyResult<PaymentIntentModel>;

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> AnyResult<PaymentIntentModel>;

    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> AnyResult<PaymentIntentModel>;

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), WebhookSignatureError>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_payment_intent(&self, intent: NewPaymentIntent) -> AnyResult<PaymentIntentModel> {
        self.create_payment_intent(intent).await
    }

    async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> AnyResult<PaymentIntentModel> {
        self.retrieve_payment_intent(payment_intent_id).await
    }

    async fn cancel_payment_intent(&self, payment_intent_id: &str) -> AnyResult<PaymentIntentModel> {
        self.cancel_payment_intent(payment_intent_id).await
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<(), WebhookSignatureError> {
        self.verify_webhook_signature(payload, signature)
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("amount_minor must be greater than zero")]
    InvalidAmount,
    #[error("payment_intent_id is required")]
    MissingPaymentIntentId,
    #[error("payment_intent_id is not a valid payment intent id")]
    InvalidPaymentIntentId,
    #[error("payment intent could not be cancelled (status {0})")]
    NotCancelled(String),
    #[error("payment provider request failed")]
    Provider(#[source] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::InvalidAmount
            | PaymentError::MissingPaymentIntentId
            | PaymentError::InvalidPaymentIntentId
            | PaymentError::NotCancelled(_) => StatusCode::BAD_REQUEST,
            PaymentError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Provider(_) => {
                AppError::BadGateway("Payment provider is unavailable".to_string())
            }
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

fn checked_intent_id(payment_intent_id: &str) -> UseCaseResult<&str> {
    let payment_intent_id = payment_intent_id.trim();
    if payment_intent_id.is_empty() {
        return Err(PaymentError::MissingPaymentIntentId);
    }
    if !is_payment_intent_id(payment_intent_id) {
        warn!(payment_intent_id, "payments: rejected malformed payment intent id");
        return Err(PaymentError::InvalidPaymentIntentId);
    }
    Ok(payment_intent_id)
}

pub struct PaymentUseCase<G>
where
    G: StripeGateway + Send + Sync + 'static,
{
    stripe_client: Arc<G>,
    publishable_key: String,
    default_currency: String,
}

impl<G> PaymentUseCase<G>
where
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(stripe_client: Arc<G>, publishable_key: String, default_currency: String) -> Self {
        Self {
            stripe_client,
            publishable_key,
            default_currency,
        }
    }

    pub async fn create_intent(
        &self,
        user_id: Uuid,
        request: CreatePaymentIntentRequest,
    ) -> UseCaseResult<PaymentIntentDto> {
        if request.amount_minor <= 0 {
            warn!(%user_id, amount_minor = request.amount_minor, "payments: rejected non-positive amount");
            return Err(PaymentError::InvalidAmount);
        }

        let currency = request
            .currency
            .map(|currency| currency.trim().to_lowercase())
            .filter(|currency| !currency.is_empty())
            .unwrap_or_else(|| self.default_currency.clone());

        let mut metadata = request.metadata;
        metadata.insert("user_id".to_string(), user_id.to_string());

        let intent = self
            .stripe_client
            .create_payment_intent(NewPaymentIntent {
                amount_minor: request.amount_minor,
                currency,
                description: request.description,
                metadata,
            })
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "payments: failed to create payment intent");
                PaymentError::Provider(err)
            })?;

        info!(
            %user_id,
            payment_intent_id = %intent.id,
            amount_minor = intent.amount_minor,
            "payments: payment intent created"
        );

        Ok(PaymentIntentDto {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_minor: intent.amount_minor,
            currency: intent.currency,
            status: intent.status,
            publishable_key: self.publishable_key.clone(),
        })
    }

    pub async fn confirm(
        &self,
        user_id: Uuid,
        request: ConfirmPaymentRequest,
    ) -> UseCaseResult<PaymentStatusDto> {
        let payment_intent_id = checked_intent_id(&request.payment_intent_id)?;

        let status = self.status(payment_intent_id).await?;
        info!(
            %user_id,
            payment_intent_id,
            order_id = ?request.order_id,
            status = %status.status,
            "payments: payment confirmation checked"
        );

        Ok(status)
    }

    pub async fn status(&self, payment_intent_id: &str) -> UseCaseResult<PaymentStatusDto> {
        let payment_intent_id = checked_intent_id(payment_intent_id)?;

        let intent = self
            .stripe_client
            .retrieve_payment_intent(payment_intent_id)
            .await
            .map_err(|err| {
                error!(payment_intent_id, error = ?err, "payments: failed to retrieve payment intent");
                PaymentError::Provider(err)
            })?;

        Ok(PaymentStatusDto::from(intent))
    }

    pub async fn cancel(&self, payment_intent_id: &str) -> UseCaseResult<()> {
        let payment_intent_id = checked_intent_id(payment_intent_id)?;

        let intent = self
            .stripe_client
            .cancel_payment_intent(payment_intent_id)
            .await
            .map_err(|err| {
                error!(payment_intent_id, error = ?err, "payments: failed to cancel payment intent");
                PaymentError::Provider(err)
            })?;

        if !intent.is_canceled() {
            warn!(payment_intent_id, status = %intent.status, "payments: intent not cancelled");
            return Err(PaymentError::NotCancelled(intent.status));
        }

        info!(payment_intent_id, "payments: payment intent cancelled");
        Ok(())
    }

    pub fn publishable_key(&self) -> PublishableKeyDto {
        PublishableKeyDto {
            publishable_key: self.publishable_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_intent(status: &str) -> PaymentIntentModel {
        PaymentIntentModel {
            id: "pi_123".to_string(),
            client_secret: Some("pi_123_secret".to_string()),
            amount_minor: 2500,
            currency: "usd".to_string(),
            status: status.to_string(),
            created_at: None,
            last_error_message: None,
        }
    }

    fn usecase(gateway: MockStripeGateway) -> PaymentUseCase<MockStripeGateway> {
        PaymentUseCase::new(Arc::new(gateway), "pk_test".to_string(), "usd".to_string())
    }

    fn create_request(amount_minor: i64, currency: Option<&str>) -> CreatePaymentIntentRequest {
        CreatePaymentIntentRequest {
            amount_minor,
            currency: currency.map(str::to_string),
            description: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn non_positive_amount_never_reaches_stripe() {
        // No expectations: any gateway call would panic.
        let usecase = usecase(MockStripeGateway::new());

        let err = usecase
            .create_intent(Uuid::new_v4(), create_request(0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount));

        let err = usecase
            .create_intent(Uuid::new_v4(), create_request(-100, None))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_intent_lowercases_currency_and_tags_user() {
        let user_id = Uuid::new_v4();
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_create_payment_intent()
            .times(1)
            .returning(move |intent| {
                assert_eq!(intent.currency, "eur");
                assert_eq!(intent.amount_minor, 2500);
                assert_eq!(intent.metadata.get("user_id"), Some(&user_id.to_string()));
                Ok(sample_intent("requires_payment_method"))
            });

        let dto = usecase(gateway)
            .create_intent(user_id, create_request(2500, Some("EUR")))
            .await
            .unwrap();

        assert_eq!(dto.payment_intent_id, "pi_123");
        assert_eq!(dto.publishable_key, "pk_test");
    }

    #[tokio::test]
    async fn create_intent_defaults_currency() {
        let mut gateway = MockStripeGateway::new();
        gateway.expect_create_payment_intent().returning(|intent| {
            assert_eq!(intent.currency, "usd");
            Ok(sample_intent("requires_payment_method"))
        });

        assert!(
            usecase(gateway)
                .create_intent(Uuid::new_v4(), create_request(100, None))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_retrieve_payment_intent()
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let err = usecase(gateway).status("pi_123").await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn confirm_requires_intent_id() {
        let err = usecase(MockStripeGateway::new())
            .confirm(
                Uuid::new_v4(),
                ConfirmPaymentRequest {
                    payment_intent_id: "  ".to_string(),
                    order_id: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::MissingPaymentIntentId));
    }

    #[tokio::test]
    async fn status_reports_success() {
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_retrieve_payment_intent()
            .returning(|_| Ok(sample_intent("succeeded")));

        let status = usecase(gateway).status("pi_123").await.unwrap();

        assert!(status.is_successful);
        assert_eq!(status.amount_minor, 2500);
    }

    #[tokio::test]
    async fn cancel_checks_provider_status() {
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_cancel_payment_intent()
            .returning(|_| Ok(sample_intent("canceled")));
        assert!(usecase(gateway).cancel("pi_123").await.is_ok());

        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_cancel_payment_intent()
            .returning(|_| Ok(sample_intent("processing")));
        let err = usecase(gateway).cancel("pi_123").await.unwrap_err();
        assert!(matches!(err, PaymentError::NotCancelled(_)));
    }

    #[tokio::test]
    async fn cancel_provider_failure_is_not_swallowed() {
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_cancel_payment_intent()
            .returning(|_| Err(anyhow::anyhow!("stripe down")));

        let err = usecase(gateway).cancel("pi_123").await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn malformed_intent_ids_never_reach_stripe() {
        // No gateway expectations: any provider call would panic.
        let usecase = usecase(MockStripeGateway::new());

        let err = usecase.status("pi_x/../../customers/cus_1").await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPaymentIntentId));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = usecase.cancel("   ").await.unwrap_err();
        assert!(matches!(err, PaymentError::MissingPaymentIntentId));

        let err = usecase
            .confirm(
                Uuid::new_v4(),
                ConfirmPaymentRequest {
                    payment_intent_id: "cus_123".to_string(),
                    order_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidPaymentIntentId));
    }
}
