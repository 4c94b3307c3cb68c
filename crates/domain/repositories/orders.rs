use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
    orders::{ManualPaymentOutcome, OrderDetails, PlaceOrderOutcome, ReconcileOutcome},
    payment_transitions::PaymentOutcome,
};

#[automock]
#[async_trait]
pub trait OrderRepository {
    /// Moves the user's cart into a new order in one transaction.
    async fn place_order(
        &self,
        user_id: Uuid,
        payment_intent_id: Option<String>,
    ) -> Result<PlaceOrderOutcome>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderDetails>>;

    async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<OrderDetails>>;

    async fn update_status(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<OrderDetails>>;

    async fn update_payment_status(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<ManualPaymentOutcome>;

    /// Applies a provider outcome to the order holding `payment_intent_id`,
    /// honouring the replay and ordering guards.
    async fn reconcile_payment(
        &self,
        payment_intent_id: String,
        outcome: PaymentOutcome,
    ) -> Result<ReconcileOutcome>;
}
