use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cart item joined with the current state of its product.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price_minor: i64,
    pub product_image_url: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartItemDto {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price_minor: i64,
    pub product_image_url: Option<String>,
    pub quantity: i32,
    pub subtotal_minor: i64,
}

impl From<CartLine> for CartItemDto {
    fn from(line: CartLine) -> Self {
        Self {
            cart_item_id: line.cart_item_id,
            product_id: line.product_id,
            subtotal_minor: line.product_price_minor * i64::from(line.quantity),
            product_name: line.product_name,
            product_price_minor: line.product_price_minor,
            product_image_url: line.product_image_url,
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartDto {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItemDto>,
    pub total_amount_minor: i64,
    pub total_items: i64,
}

impl CartDto {
    pub fn new(cart_id: Uuid, user_id: Uuid, lines: Vec<CartLine>) -> Self {
        let items: Vec<CartItemDto> = lines.into_iter().map(CartItemDto::from).collect();
        Self {
            cart_id,
            user_id,
            total_amount_minor: items.iter().map(|item| item.subtotal_minor).sum(),
            total_items: items.iter().map(|item| i64::from(item.quantity)).sum(),
            items,
        }
    }
}
