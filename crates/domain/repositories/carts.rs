use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{entities::carts::CartEntity, value_objects::carts::CartLine};

#[automock]
#[async_trait]
pub trait CartRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartEntity>>;

    /// Returns the user's cart, creating it on first use.
    async fn get_or_create(&self, user_id: Uuid) -> Result<CartEntity>;

    async fn lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>>;

    /// Adds `quantity` to an existing line for the product or inserts a new one.
    async fn add_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()>;

    /// Returns `false` when the item does not belong to the cart.
    async fn update_item_quantity(
        &self,
        cart_id: Uuid,
        cart_item_id: Uuid,
        quantity: i32,
    ) -> Result<bool>;

    async fn remove_item(&self, cart_id: Uuid, cart_item_id: Uuid) -> Result<bool>;

    async fn clear(&self, cart_id: Uuid) -> Result<()>;
}
