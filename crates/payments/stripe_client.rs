use std::{collections::HashMap, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::domain::value_objects::payments::{
    NewPaymentIntent, PaymentIntentModel, is_payment_intent_id,
};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
    webhook_tolerance_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Payment intent the event refers to. Checkout sessions carry it in
    /// `payment_intent`; payment intent events are the intent itself.
    pub fn payment_intent_id(&self) -> Option<String> {
        let field = if self.type_.starts_with("checkout.session.") {
            "payment_intent"
        } else {
            "id"
        };

        self.data
            .object
            .get(field)
            .and_then(|value| value.as_str())
            .filter(|id| !id.is_empty())
            .map(|id| id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookSignatureError {
    #[error("stripe-signature header is malformed")]
    MalformedHeader,
    #[error("webhook timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("no matching v1 signature")]
    SignatureMismatch,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    created: Option<i64>,
    last_payment_error: Option<StripeLastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct StripeLastPaymentError {
    message: Option<String>,
}

impl From<StripePaymentIntent> for PaymentIntentModel {
    fn from(intent: StripePaymentIntent) -> Self {
        Self {
            id: intent.id,
            client_secret: intent.client_secret,
            amount_minor: intent.amount,
            currency: intent.currency,
            status: intent.status,
            created_at: intent
                .created
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            last_error_message: intent.last_payment_error.and_then(|err| err.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
    decline_code: Option<String>,
}

impl StripeClient {
    pub fn new(
        secret_key: String,
        webhook_secret: String,
        timeout: Duration,
        webhook_tolerance_secs: i64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base: STRIPE_API_BASE.to_string(),
            secret_key,
            webhook_secret,
            webhook_tolerance_secs,
        })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            stripe_error_param = ?details.as_ref().and_then(|d| d.param.as_deref()),
            stripe_error_message = ?details.as_ref().and_then(|d| d.message.as_deref()),
            stripe_decline_code = ?details.as_ref().and_then(|d| d.decline_code.as_deref()),
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// https://stripe.com/docs/api/payment_intents/create
    pub async fn create_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntentModel> {
        let mut body: Vec<(String, String)> = vec![
            ("amount".to_string(), intent.amount_minor.to_string()),
            ("currency".to_string(), intent.currency),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        if let Some(description) = intent.description {
            body.push(("description".to_string(), description));
        }

        for (key, value) in intent.metadata {
            body.push((format!("metadata[{}]", key), value));
        }

        let resp = self
            .http
            .post(format!("{}/payment_intents", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create payment intent").await?;

        let parsed: StripePaymentIntent = resp.json().await?;
        Ok(parsed.into())
    }

    /// https://stripe.com/docs/api/payment_intents/retrieve
    pub async fn retrieve_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentModel> {
        anyhow::ensure!(
            is_payment_intent_id(payment_intent_id),
            "refusing malformed payment intent id"
        );

        let resp = self
            .http
            .get(format!("{}/payment_intents/{}", self.api_base, payment_intent_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve payment intent").await?;

        let parsed: StripePaymentIntent = resp.json().await?;
        Ok(parsed.into())
    }

    /// https://stripe.com/docs/api/payment_intents/cancel
    pub async fn cancel_payment_intent(&self, payment_intent_id: &str) -> Result<PaymentIntentModel> {
        anyhow::ensure!(
            is_payment_intent_id(payment_intent_id),
            "refusing malformed payment intent id"
        );

        let resp = self
            .http
            .post(format!(
                "{}/payment_intents/{}/cancel",
                self.api_base, payment_intent_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&HashMap::<String, String>::new())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel payment intent").await?;

        let parsed: StripePaymentIntent = resp.json().await?;
        Ok(parsed.into())
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), WebhookSignatureError> {
        self.verify_webhook_signature_at(payload, signature_header, Utc::now().timestamp())
    }

    pub fn verify_webhook_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookSignatureError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp = timestamp.ok_or(WebhookSignatureError::MalformedHeader)?;
        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| WebhookSignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(WebhookSignatureError::MalformedHeader);
        }

        if now.abs_diff(issued_at) > self.webhook_tolerance_secs.unsigned_abs() {
            return Err(WebhookSignatureError::TimestampOutOfTolerance);
        }

        let matched = signatures.iter().any(|signature| {
            let Ok(provided) = hex::decode(signature) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(self.webhook_secret.as_bytes()) else {
                return false;
            };
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            mac.verify_slice(&provided).is_ok()
        });

        if matched {
            Ok(())
        } else {
            Err(WebhookSignatureError::SignatureMismatch)
        }
    }

    pub fn parse_event(payload: &[u8]) -> Result<StripeEvent> {
        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}
