use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-side state of a payment intent.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntentModel {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_error_message: Option<String>,
}

impl PaymentIntentModel {
    pub fn is_successful(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn is_canceled(&self) -> bool {
        self.status == "canceled"
    }
}

/// Payment intent ids are `pi_` followed by ASCII alphanumerics or underscores,
/// which also keeps them safe as a single URL path segment.
pub fn is_payment_intent_id(value: &str) -> bool {
    value.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentIntent {
    pub amount_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount_minor: i64,
    pub currency: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentIntentDto {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub publishable_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
    pub order_id: Option<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentStatusDto {
    pub payment_intent_id: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
    pub is_successful: bool,
    pub error_message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PaymentIntentModel> for PaymentStatusDto {
    fn from(intent: PaymentIntentModel) -> Self {
        Self {
            is_successful: intent.is_successful(),
            payment_intent_id: intent.id,
            status: intent.status,
            amount_minor: intent.amount_minor,
            currency: intent.currency,
            error_message: intent.last_error_message,
            created_at: intent.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublishableKeyDto {
    pub publishable_key: String,
}

/// Outcome of a webhook delivery, echoed back to the provider.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_intent_id_shape() {
        assert!(is_payment_intent_id("pi_3Nq2x1LkdIwHu7ix0"));
        assert!(is_payment_intent_id("pi_1_secret_part"));
        assert!(!is_payment_intent_id("pi_"));
        assert!(!is_payment_intent_id("cus_123"));
        assert!(!is_payment_intent_id("pi_x/../../customers/cus_1"));
        assert!(!is_payment_intent_id("pi_1?expand=customer"));
        assert!(!is_payment_intent_id(""));
    }
}
