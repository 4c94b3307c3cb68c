use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            carts::CartEntity,
            orders::{InsertOrderEntity, InsertOrderItemEntity, OrderEntity, OrderItemEntity},
        },
        repositories::orders::OrderRepository,
        value_objects::{
            enums::{order_statuses::OrderStatus, payment_statuses::PaymentStatus},
            orders::{
                ManualPaymentOutcome, OrderDetails, OrderDraft, OrderLine, PlaceOrderOutcome,
                PricedCartLine, ReconcileOutcome, normalize_intent_id, status_pair_of,
            },
            payment_transitions::{
                PaymentOutcome, TransitionDecision, decide_transition, order_status_for,
            },
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::PgPoolSquad,
            schema::{cart_items, carts, order_items, orders, products},
        },
        repositories::is_unique_violation,
    },
};

pub struct OrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn load_lines(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Vec<OrderLine>>> {
    let rows = order_items::table
        .left_join(products::table.on(products::id.eq(order_items::product_id)))
        .filter(order_items::order_id.eq_any(order_ids))
        .select((
            OrderItemEntity::as_select(),
            products::name.nullable(),
            products::image_url.nullable(),
        ))
        .load::<(OrderItemEntity, Option<String>, Option<String>)>(conn)?;

    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for (item, product_name, product_image_url) in rows {
        lines.entry(item.order_id).or_default().push(OrderLine {
            item,
            product_name,
            product_image_url,
        });
    }

    Ok(lines)
}

fn load_details(conn: &mut PgConnection, order: OrderEntity) -> QueryResult<OrderDetails> {
    let mut lines = load_lines(conn, &[order.id])?;
    let lines = lines.remove(&order.id).unwrap_or_default();
    Ok(OrderDetails { order, lines })
}

fn find_order_for_update(
    conn: &mut PgConnection,
    order_id: Uuid,
    user_id: Uuid,
) -> QueryResult<Option<OrderEntity>> {
    orders::table
        .filter(orders::id.eq(order_id))
        .filter(orders::user_id.eq(user_id))
        .select(OrderEntity::as_select())
        .for_update()
        .first::<OrderEntity>(conn)
        .optional()
}

#[async_trait]
impl OrderRepository for OrderPostgres {
    async fn place_order(
        &self,
        user_id: Uuid,
        payment_intent_id: Option<String>,
    ) -> Result<PlaceOrderOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<PlaceOrderOutcome, diesel::result::Error, _>(|conn| {
            let cart = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartEntity::as_select())
                .for_update()
                .first::<CartEntity>(conn)
                .optional()?;

            let Some(cart) = cart else {
                return Ok(PlaceOrderOutcome::EmptyCart);
            };

            let rows = cart_items::table
                .left_join(products::table)
                .filter(cart_items::cart_id.eq(cart.id))
                .order((cart_items::date_added.asc(), cart_items::id.asc()))
                .select((
                    cart_items::product_id,
                    cart_items::quantity,
                    products::price_minor.nullable(),
                ))
                .load::<(Uuid, i32, Option<i64>)>(conn)?;

            let mut lines = Vec::with_capacity(rows.len());
            for (product_id, quantity, price_minor) in rows {
                let Some(unit_price_minor) = price_minor else {
                    return Ok(PlaceOrderOutcome::MissingProduct(product_id));
                };
                lines.push(PricedCartLine {
                    product_id,
                    quantity,
                    unit_price_minor,
                });
            }

            let Some(draft) = OrderDraft::from_cart_lines(&lines, payment_intent_id) else {
                return Ok(PlaceOrderOutcome::EmptyCart);
            };

            let now = Utc::now();
            let order = diesel::insert_into(orders::table)
                .values(&InsertOrderEntity {
                    user_id,
                    total_minor: draft.total_minor,
                    status: OrderStatus::Pending.to_string(),
                    payment_status: draft.payment_status.to_string(),
                    payment_intent_id: draft.payment_intent_id.clone(),
                    created_at: now,
                    updated_at: now,
                })
                .returning(OrderEntity::as_returning())
                .get_result::<OrderEntity>(conn)?;

            let items: Vec<InsertOrderItemEntity> = draft
                .items
                .iter()
                .map(|item| InsertOrderItemEntity {
                    order_id: order.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price_minor: item.price_minor,
                })
                .collect();

            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            diesel::update(carts::table.find(cart.id))
                .set(carts::updated_at.eq(now))
                .execute(conn)?;

            debug!(order_id = %order.id, items = items.len(), "orders: cart moved into order");

            Ok(PlaceOrderOutcome::Placed(OrderDetails {
                order,
                lines: Vec::new(),
            }))
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) if is_unique_violation(&err) => {
                return Ok(PlaceOrderOutcome::DuplicatePaymentIntent);
            }
            Err(err) => return Err(err.into()),
        };

        // Reload after commit so the caller sees items joined with product data.
        match outcome {
            PlaceOrderOutcome::Placed(details) => {
                let reloaded = load_details(&mut conn, details.order)?;
                Ok(PlaceOrderOutcome::Placed(reloaded))
            }
            other => Ok(other),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderDetails>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let orders = orders::table
            .filter(orders::user_id.eq(user_id))
            .order((orders::created_at.desc(), orders::id.asc()))
            .select(OrderEntity::as_select())
            .load::<OrderEntity>(&mut conn)?;

        let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let mut lines = load_lines(&mut conn, &order_ids)?;

        let details = orders
            .into_iter()
            .map(|order| {
                let lines = lines.remove(&order.id).unwrap_or_default();
                OrderDetails { order, lines }
            })
            .collect();

        Ok(details)
    }

    async fn find_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Option<OrderDetails>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .filter(orders::user_id.eq(user_id))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        match order {
            Some(order) => Ok(Some(load_details(&mut conn, order)?)),
            None => Ok(None),
        }
    }

    async fn update_status(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<OrderDetails>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::user_id.eq(user_id)),
        )
        .set((
            orders::status.eq(status.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .returning(OrderEntity::as_returning())
        .get_result::<OrderEntity>(&mut conn)
        .optional()?;

        match updated {
            Some(order) => Ok(Some(load_details(&mut conn, order)?)),
            None => Ok(None),
        }
    }

    async fn update_payment_status(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        payment_status: PaymentStatus,
        payment_intent_id: Option<String>,
    ) -> Result<ManualPaymentOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let requested_intent = normalize_intent_id(payment_intent_id);

        let result = conn.transaction::<ManualPaymentOutcome, diesel::result::Error, _>(|conn| {
            let Some(order) = find_order_for_update(conn, order_id, user_id)? else {
                return Ok(ManualPaymentOutcome::NotFound);
            };

            if let (Some(existing), Some(requested)) =
                (order.payment_intent_id.as_deref(), requested_intent.as_deref())
            {
                if existing != requested {
                    return Ok(ManualPaymentOutcome::IntentConflict);
                }
            }

            let intent = order.payment_intent_id.clone().or(requested_intent.clone());
            let status = order_status_for(payment_status)
                .map(|status| status.to_string())
                .unwrap_or_else(|| order.status.clone());

            let updated = diesel::update(orders::table.find(order.id))
                .set((
                    orders::payment_status.eq(payment_status.as_str()),
                    orders::status.eq(status),
                    orders::payment_intent_id.eq(intent),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderEntity::as_returning())
                .get_result::<OrderEntity>(conn)?;

            Ok(ManualPaymentOutcome::Updated(load_details(conn, updated)?))
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if is_unique_violation(&err) => Ok(ManualPaymentOutcome::IntentConflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn reconcile_payment(
        &self,
        payment_intent_id: String,
        outcome: PaymentOutcome,
    ) -> Result<ReconcileOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<ReconcileOutcome, diesel::result::Error, _>(|conn| {
            let order = orders::table
                .filter(orders::payment_intent_id.eq(&payment_intent_id))
                .select(OrderEntity::as_select())
                .for_update()
                .first::<OrderEntity>(conn)
                .optional()?;

            let Some(order) = order else {
                return Ok(ReconcileOutcome::OrderNotFound);
            };

            let current = status_pair_of(&order);
            let target = outcome.target();

            match decide_transition(current, target) {
                TransitionDecision::AlreadyApplied => {
                    Ok(ReconcileOutcome::AlreadyApplied { order_id: order.id })
                }
                TransitionDecision::Stale => Ok(ReconcileOutcome::Stale {
                    order_id: order.id,
                    current,
                }),
                TransitionDecision::Apply => {
                    diesel::update(orders::table.find(order.id))
                        .set((
                            orders::payment_status.eq(target.payment_status.as_str()),
                            orders::status.eq(target.status.as_str()),
                            orders::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)?;

                    Ok(ReconcileOutcome::Applied {
                        order_id: order.id,
                        from: current,
                        to: target,
                    })
                }
            }
        })?;

        Ok(result)
    }
}
