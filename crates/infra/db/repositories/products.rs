use anyhow::Result;
use async_trait::async_trait;
use diesel::{pg::Pg, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::products::{InsertProductEntity, ProductEntity, UpdateProductEntity},
        repositories::products::ProductRepository,
        value_objects::{
            enums::product_sorts::ProductSort,
            products::{ProductFilter, ProductListing},
        },
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::products},
};

pub struct ProductPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProductPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn filtered(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();

    if let Some(term) = &filter.search_term {
        let pattern = like_pattern(term);
        query = query.filter(
            products::name
                .ilike(pattern.clone())
                .or(products::description.ilike(pattern)),
        );
    }
    if let Some(min_price) = filter.min_price {
        query = query.filter(products::price_minor.ge(min_price));
    }
    if let Some(max_price) = filter.max_price {
        query = query.filter(products::price_minor.le(max_price));
    }

    query
}

#[async_trait]
impl ProductRepository for ProductPostgres {
    async fn list(&self, filter: ProductFilter) -> Result<ProductListing> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total_count = filtered(&filter).count().get_result::<i64>(&mut conn)?;

        let query = filtered(&filter);
        let query = match filter.sort {
            ProductSort::PriceAsc => query.order((products::price_minor.asc(), products::id.asc())),
            ProductSort::PriceDesc => {
                query.order((products::price_minor.desc(), products::id.asc()))
            }
            ProductSort::NameAsc => query.order((products::name.asc(), products::id.asc())),
            ProductSort::NameDesc => query.order((products::name.desc(), products::id.asc())),
            ProductSort::DateAsc => query.order((products::created_at.asc(), products::id.asc())),
            ProductSort::DateDesc => {
                query.order((products::created_at.desc(), products::id.asc()))
            }
        };

        let products = query
            .select(ProductEntity::as_select())
            .offset(filter.offset())
            .limit(filter.page_size)
            .load::<ProductEntity>(&mut conn)?;

        Ok(ProductListing {
            products,
            total_count,
        })
    }

    async fn find_by_id(&self, product_id: Uuid) -> Result<Option<ProductEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let product = products::table
            .find(product_id)
            .select(ProductEntity::as_select())
            .first::<ProductEntity>(&mut conn)
            .optional()?;

        Ok(product)
    }

    async fn create(&self, product: InsertProductEntity) -> Result<ProductEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = diesel::insert_into(products::table)
            .values(&product)
            .returning(ProductEntity::as_returning())
            .get_result::<ProductEntity>(&mut conn)?;

        Ok(created)
    }

    async fn update(
        &self,
        product_id: Uuid,
        changes: UpdateProductEntity,
    ) -> Result<Option<ProductEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = diesel::update(products::table.find(product_id))
            .set(&changes)
            .returning(ProductEntity::as_returning())
            .get_result::<ProductEntity>(&mut conn)
            .optional()?;

        Ok(updated)
    }

    async fn delete(&self, product_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = diesel::delete(products::table.find(product_id)).execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
