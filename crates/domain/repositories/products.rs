use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::products::{InsertProductEntity, ProductEntity, UpdateProductEntity},
    value_objects::products::{ProductFilter, ProductListing},
};

#[automock]
#[async_trait]
pub trait ProductRepository {
    async fn list(&self, filter: ProductFilter) -> Result<ProductListing>;

    async fn find_by_id(&self, product_id: Uuid) -> Result<Option<ProductEntity>>;

    async fn create(&self, product: InsertProductEntity) -> Result<ProductEntity>;

    async fn update(
        &self,
        product_id: Uuid,
        changes: UpdateProductEntity,
    ) -> Result<Option<ProductEntity>>;

    /// Returns `false` when no product had this id.
    async fn delete(&self, product_id: Uuid) -> Result<bool>;
}
