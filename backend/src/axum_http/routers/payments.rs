use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use storefront::{
    domain::value_objects::payments::{ConfirmPaymentRequest, CreatePaymentIntentRequest},
    payments::stripe_client::StripeClient,
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    config::config_model::DotEnvyConfig,
    usecases::payments::{PaymentUseCase, StripeGateway},
};

pub fn routes(config: Arc<DotEnvyConfig>, stripe_client: Arc<StripeClient>) -> Router {
    let usecase = PaymentUseCase::new(
        stripe_client,
        config.stripe.publishable_key.clone(),
        config.stripe.currency.clone(),
    );

    router(Arc::new(usecase))
}

pub fn router<G>(usecase: Arc<PaymentUseCase<G>>) -> Router
where
    G: StripeGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/create-intent", post(create_intent))
        .route("/confirm", post(confirm_payment))
        .route("/status/:payment_intent_id", get(payment_status))
        .route("/cancel/:payment_intent_id", post(cancel_payment))
        .route("/publishable-key", get(publishable_key))
        .with_state(usecase)
}

pub async fn create_intent<G>(
    State(usecase): State<Arc<PaymentUseCase<G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> impl IntoResponse
where
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.create_intent(user_id, request).await {
        Ok(intent) => Json(intent).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn confirm_payment<G>(
    State(usecase): State<Arc<PaymentUseCase<G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> impl IntoResponse
where
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.confirm(user_id, request).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn payment_status<G>(
    State(usecase): State<Arc<PaymentUseCase<G>>>,
    _auth: AuthUser,
    Path(payment_intent_id): Path<String>,
) -> impl IntoResponse
where
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.status(&payment_intent_id).await {
        Ok(status) => Json(status).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn cancel_payment<G>(
    State(usecase): State<Arc<PaymentUseCase<G>>>,
    _auth: AuthUser,
    Path(payment_intent_id): Path<String>,
) -> impl IntoResponse
where
    G: StripeGateway + Send + Sync + 'static,
{
    match usecase.cancel(&payment_intent_id).await {
        Ok(()) => Json(json!({ "message": "Payment cancelled successfully" })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn publishable_key<G>(State(usecase): State<Arc<PaymentUseCase<G>>>) -> impl IntoResponse
where
    G: StripeGateway + Send + Sync + 'static,
{
    Json(usecase.publishable_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtTokenAuthority, SharedTokenAuthority, TokenAuthority};
    use crate::config::config_model::Jwt;
    use crate::usecases::payments::MockStripeGateway;
    use axum::{
        Extension,
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn authority() -> SharedTokenAuthority {
        Arc::new(JwtTokenAuthority::new(&Jwt {
            secret: "supersecretjwtsecretforunittesting123".to_string(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            expiration_minutes: 60,
        }))
    }

    fn app(gateway: MockStripeGateway) -> Router {
        let usecase = PaymentUseCase::new(
            Arc::new(gateway),
            "pk_test_123".to_string(),
            "usd".to_string(),
        );
        router(Arc::new(usecase)).layer(Extension(authority()))
    }

    #[tokio::test]
    async fn publishable_key_is_anonymous() {
        let response = app(MockStripeGateway::new())
            .oneshot(
                Request::builder()
                    .uri("/publishable-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_positive_amount_never_reaches_provider() {
        let issued = authority().issue(Uuid::new_v4(), "shopper@example.com").unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/create-intent")
            .header("authorization", format!("Bearer {}", issued.token))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"amount_minor":0}"#))
            .unwrap();

        let response = app(MockStripeGateway::new()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let mut gateway = MockStripeGateway::new();
        gateway
            .expect_retrieve_payment_intent()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let issued = authority().issue(Uuid::new_v4(), "shopper@example.com").unwrap();
        let request = Request::builder()
            .uri("/status/pi_123")
            .header("authorization", format!("Bearer {}", issued.token))
            .body(Body::empty())
            .unwrap();

        let response = app(gateway).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
