use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::products::ProductEntity, value_objects::enums::product_sorts::ProductSort,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_minor: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductEntity> for ProductDto {
    fn from(entity: ProductEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            price_minor: entity.price_minor,
            image_url: entity.image_url,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Raw query string of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListQuery {
    pub search_term: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<String>,
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

/// Normalised listing filter handed to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub search_term: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: ProductSort,
    pub page_number: i64,
    pub page_size: i64,
}

impl ProductFilter {
    /// Saturates so far-out pages resolve to an empty result.
    pub fn offset(&self) -> i64 {
        (self.page_number - 1).saturating_mul(self.page_size)
    }
}

impl From<ProductListQuery> for ProductFilter {
    fn from(query: ProductListQuery) -> Self {
        Self {
            search_term: query
                .search_term
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty()),
            min_price: query.min_price,
            max_price: query.max_price,
            sort: query
                .sort_by
                .as_deref()
                .and_then(ProductSort::from_str)
                .unwrap_or_default(),
            page_number: query.page_number.unwrap_or(1).max(1),
            page_size: query
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub products: Vec<ProductEntity>,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductPageDto {
    pub products: Vec<ProductDto>,
    pub total_count: i64,
    pub page_number: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl ProductPageDto {
    pub fn new(listing: ProductListing, filter: &ProductFilter) -> Self {
        let total_pages = (listing.total_count + filter.page_size - 1) / filter.page_size;
        Self {
            products: listing.products.into_iter().map(ProductDto::from).collect(),
            total_count: listing.total_count,
            page_number: filter.page_number,
            page_size: filter.page_size,
            total_pages,
            has_previous_page: filter.page_number > 1,
            has_next_page: filter.page_number < total_pages,
        }
    }
}

/// Product fields submitted on create and update.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductForm {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 500, message = "description must be 1 to 500 characters"))]
    pub description: String,
    #[validate(range(min = 1, message = "price_minor must be greater than zero"))]
    pub price_minor: i64,
    #[validate(url(message = "image_url must be a valid URL"), length(max = 2083))]
    pub image_url: Option<String>,
}
