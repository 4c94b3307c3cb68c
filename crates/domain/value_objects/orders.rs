use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    entities::orders::{OrderEntity, OrderItemEntity},
    value_objects::{
        enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
        payment_transitions::StatusPair,
    },
};

/// Order item joined with the product it was bought from. The product may have
/// been deleted since, so its display fields are optional.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item: OrderItemEntity,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: OrderEntity,
    pub lines: Vec<OrderLine>,
}

impl OrderDetails {
    pub fn status_pair(&self) -> StatusPair {
        status_pair_of(&self.order)
    }
}

/// Strict read of the stored status columns.
pub fn parse_status_pair(order: &OrderEntity) -> Option<StatusPair> {
    Some(StatusPair {
        payment_status: PaymentStatus::from_str(&order.payment_status)?,
        status: OrderStatus::from_str(&order.status)?,
    })
}

/// Unrecognized stored values read as `Pending` and are logged.
pub fn status_pair_of(order: &OrderEntity) -> StatusPair {
    if let Some(pair) = parse_status_pair(order) {
        return pair;
    }

    warn!(
        order_id = %order.id,
        status = %order.status,
        payment_status = %order.payment_status,
        "unrecognized stored order status, reading as pending"
    );

    StatusPair {
        payment_status: PaymentStatus::from_str(&order.payment_status)
            .unwrap_or(PaymentStatus::Pending),
        status: OrderStatus::from_str(&order.status).unwrap_or(OrderStatus::Pending),
    }
}

/// Cart line priced at the product's current price.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraftItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_minor: i64,
}

/// Totals and price snapshots computed before an order is written.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub total_minor: i64,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderDraftItem>,
}

impl OrderDraft {
    /// Returns `None` for an empty cart.
    pub fn from_cart_lines(
        lines: &[PricedCartLine],
        payment_intent_id: Option<String>,
    ) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }

        let items: Vec<OrderDraftItem> = lines
            .iter()
            .map(|line| OrderDraftItem {
                product_id: line.product_id,
                quantity: line.quantity,
                price_minor: line.unit_price_minor,
            })
            .collect();

        let total_minor = items
            .iter()
            .map(|item| item.price_minor * i64::from(item.quantity))
            .sum();

        let payment_intent_id = normalize_intent_id(payment_intent_id);
        let payment_status = if payment_intent_id.is_some() {
            PaymentStatus::Processing
        } else {
            PaymentStatus::Pending
        };

        Some(Self {
            total_minor,
            payment_status,
            payment_intent_id,
            items,
        })
    }
}

/// Blank intent ids count as absent.
pub fn normalize_intent_id(value: Option<String>) -> Option<String> {
    value
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOrderOutcome {
    Placed(OrderDetails),
    EmptyCart,
    MissingProduct(Uuid),
    DuplicatePaymentIntent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManualPaymentOutcome {
    Updated(OrderDetails),
    NotFound,
    /// The order already carries a different intent id, or the id belongs to another order.
    IntentConflict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    OrderNotFound,
    AlreadyApplied {
        order_id: Uuid,
    },
    Stale {
        order_id: Uuid,
        current: StatusPair,
    },
    Applied {
        order_id: Uuid,
        from: StatusPair,
        to: StatusPair,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderItemDto {
    pub order_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
    pub quantity: i32,
    pub price_minor: i64,
    pub subtotal_minor: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderDto {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_amount_minor: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_items: i64,
    pub items: Vec<OrderItemDto>,
}

impl From<OrderDetails> for OrderDto {
    fn from(details: OrderDetails) -> Self {
        let pair = details.status_pair();
        let items: Vec<OrderItemDto> = details
            .lines
            .into_iter()
            .map(|line| OrderItemDto {
                order_item_id: line.item.id,
                product_id: line.item.product_id,
                product_name: line.product_name,
                product_image_url: line.product_image_url,
                quantity: line.item.quantity,
                price_minor: line.item.price_minor,
                subtotal_minor: line.item.price_minor * i64::from(line.item.quantity),
            })
            .collect();

        Self {
            order_id: details.order.id,
            user_id: details.order.user_id,
            total_amount_minor: details.order.total_minor,
            status: pair.status,
            payment_status: pair.payment_status,
            payment_intent_id: details.order.payment_intent_id,
            order_date: details.order.created_at,
            updated_at: details.order.updated_at,
            total_items: items.iter().map(|item| i64::from(item.quantity)).sum(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price_minor: i64) -> PricedCartLine {
        PricedCartLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price_minor,
        }
    }

    #[test]
    fn draft_totals_and_snapshots_prices() {
        let a = line(2, 1000);
        let b = line(1, 500);

        let draft = OrderDraft::from_cart_lines(&[a.clone(), b.clone()], None).unwrap();

        assert_eq!(draft.total_minor, 2500);
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[0].product_id, a.product_id);
        assert_eq!(draft.items[0].price_minor, 1000);
        assert_eq!(draft.items[1].price_minor, 500);
        assert_eq!(draft.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn draft_with_intent_starts_processing() {
        let draft =
            OrderDraft::from_cart_lines(&[line(1, 100)], Some("pi_123".to_string())).unwrap();

        assert_eq!(draft.payment_status, PaymentStatus::Processing);
        assert_eq!(draft.payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn blank_intent_counts_as_none() {
        let draft =
            OrderDraft::from_cart_lines(&[line(1, 100)], Some("   ".to_string())).unwrap();

        assert_eq!(draft.payment_status, PaymentStatus::Pending);
        assert_eq!(draft.payment_intent_id, None);
    }

    fn stored_order(status: &str, payment_status: &str) -> OrderEntity {
        let now = Utc::now();
        OrderEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_minor: 100,
            status: status.to_string(),
            payment_status: payment_status.to_string(),
            payment_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_stored_status_reads_as_pending() {
        let order = stored_order("paid", "settled");

        assert_eq!(parse_status_pair(&order), None);
        assert_eq!(
            status_pair_of(&order),
            StatusPair {
                payment_status: PaymentStatus::Pending,
                status: OrderStatus::Paid,
            }
        );

        let order = stored_order("completed", "succeeded");
        assert_eq!(
            parse_status_pair(&order),
            Some(StatusPair {
                payment_status: PaymentStatus::Succeeded,
                status: OrderStatus::Completed,
            })
        );
    }

    #[test]
    fn empty_cart_has_no_draft() {
        assert_eq!(OrderDraft::from_cart_lines(&[], None), None);
    }

    #[test]
    fn dto_uses_snapshot_prices() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let details = OrderDetails {
            order: OrderEntity {
                id: order_id,
                user_id: Uuid::new_v4(),
                total_minor: 2500,
                status: "paid".to_string(),
                payment_status: "succeeded".to_string(),
                payment_intent_id: Some("pi_1".to_string()),
                created_at: now,
                updated_at: now,
            },
            lines: vec![OrderLine {
                item: OrderItemEntity {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: Uuid::new_v4(),
                    quantity: 2,
                    price_minor: 1000,
                },
                product_name: None,
                product_image_url: None,
            }],
        };

        let dto = OrderDto::from(details);

        assert_eq!(dto.status, OrderStatus::Paid);
        assert_eq!(dto.payment_status, PaymentStatus::Succeeded);
        assert_eq!(dto.total_items, 2);
        assert_eq!(dto.items[0].subtotal_minor, 2000);
    }
}
