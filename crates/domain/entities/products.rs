use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::products;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = products)]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_minor: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = products)]
pub struct InsertProductEntity {
    pub name: String,
    pub description: String,
    pub price_minor: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `image_url: None` leaves the stored image untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = products)]
pub struct UpdateProductEntity {
    pub name: String,
    pub description: String,
    pub price_minor: i64,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
