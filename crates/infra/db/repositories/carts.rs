use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{prelude::*, upsert::excluded};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::carts::{CartEntity, InsertCartEntity, InsertCartItemEntity},
        repositories::carts::CartRepository,
        value_objects::carts::CartLine,
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{cart_items, carts, products},
    },
};

pub struct CartPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CartPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn touch_cart(conn: &mut PgConnection, cart_id: Uuid) -> QueryResult<usize> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(Utc::now()))
        .execute(conn)
}

#[async_trait]
impl CartRepository for CartPostgres {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first::<CartEntity>(&mut conn)
            .optional()?;

        Ok(cart)
    }

    async fn get_or_create(&self, user_id: Uuid) -> Result<CartEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        diesel::insert_into(carts::table)
            .values(&InsertCartEntity {
                user_id,
                created_at: now,
                updated_at: now,
            })
            .on_conflict(carts::user_id)
            .do_nothing()
            .execute(&mut conn)?;

        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .select(CartEntity::as_select())
            .first::<CartEntity>(&mut conn)?;

        Ok(cart)
    }

    async fn lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::cart_id.eq(cart_id))
            .order((cart_items::date_added.asc(), cart_items::id.asc()))
            .select((
                cart_items::id,
                cart_items::product_id,
                products::name,
                products::price_minor,
                products::image_url,
                cart_items::quantity,
            ))
            .load::<(Uuid, Uuid, String, i64, Option<String>, i32)>(&mut conn)?;

        let lines = rows
            .into_iter()
            .map(
                |(cart_item_id, product_id, product_name, product_price_minor, product_image_url, quantity)| {
                    CartLine {
                        cart_item_id,
                        product_id,
                        product_name,
                        product_price_minor,
                        product_image_url,
                        quantity,
                    }
                },
            )
            .collect();

        Ok(lines)
    }

    async fn add_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            diesel::insert_into(cart_items::table)
                .values(&InsertCartItemEntity {
                    cart_id,
                    product_id,
                    quantity,
                    date_added: Utc::now(),
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
                .execute(conn)?;

            touch_cart(conn, cart_id)?;
            Ok(())
        })?;

        Ok(())
    }

    async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let updated = diesel::update(
                cart_items::table
                    .filter(cart_items::id.eq(cart_item_id))
                    .filter(cart_items::cart_id.eq(cart_id)),
            )
            .set(cart_items::quantity.eq(quantity))
            .execute(conn)?;

            if updated > 0 {
                touch_cart(conn, cart_id)?;
            }
            Ok(updated)
        })?;

        Ok(updated > 0)
    }

    async fn remove_item(&self, cart_id: Uuid, cart_item_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::id.eq(cart_item_id))
                    .filter(cart_items::cart_id.eq(cart_id)),
            )
            .execute(conn)?;

            if deleted > 0 {
                touch_cart(conn, cart_id)?;
            }
            Ok(deleted)
        })?;

        Ok(deleted > 0)
    }

    async fn clear(&self, cart_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                .execute(conn)?;
            touch_cart(conn, cart_id)?;
            Ok(())
        })?;

        Ok(())
    }
}
