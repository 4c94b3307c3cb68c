use std::sync::Arc;

use axum::http::StatusCode;
use storefront::domain::{
    repositories::{carts::CartRepository, products::ProductRepository},
    value_objects::carts::{AddToCartRequest, CartDto, UpdateCartItemRequest},
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("product not found")]
    ProductNotFound,
    #[error("cart item not found")]
    ItemNotFound,
    #[error("cart not found")]
    CartNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CartError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
            CartError::ProductNotFound | CartError::ItemNotFound | CartError::CartNotFound => {
                StatusCode::NOT_FOUND
            }
            CartError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity => AppError::BadRequest(err.to_string()),
            CartError::Internal(inner) => AppError::Internal(inner),
            other => AppError::NotFound(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CartError>;

fn internal(user_id: Uuid, action: &'static str) -> impl FnOnce(anyhow::Error) -> CartError {
    move |err| {
        error!(%user_id, db_error = ?err, action, "cart: repository call failed");
        CartError::Internal(err)
    }
}

pub struct CartUseCase<C, P>
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    cart_repo: Arc<C>,
    product_repo: Arc<P>,
}

impl<C, P> CartUseCase<C, P>
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    pub fn new(cart_repo: Arc<C>, product_repo: Arc<P>) -> Self {
        Self {
            cart_repo,
            product_repo,
        }
    }

    pub async fn get_cart(&self, user_id: Uuid) -> UseCaseResult<CartDto> {
        let cart = self
            .cart_repo
            .get_or_create(user_id)
            .await
            .map_err(internal(user_id, "get_or_create"))?;

        let lines = self
            .cart_repo
            .lines(cart.id)
            .await
            .map_err(internal(user_id, "lines"))?;

        Ok(CartDto::new(cart.id, user_id, lines))
    }

    pub async fn add_item(&self, user_id: Uuid, request: AddToCartRequest) -> UseCaseResult<CartDto> {
        if request.quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .product_repo
            .find_by_id(request.product_id)
            .await
            .map_err(internal(user_id, "find_product"))?;
        if product.is_none() {
            return Err(CartError::ProductNotFound);
        }

        let cart = self
            .cart_repo
            .get_or_create(user_id)
            .await
            .map_err(internal(user_id, "get_or_create"))?;

        self.cart_repo
            .add_item(cart.id, request.product_id, request.quantity)
            .await
            .map_err(internal(user_id, "add_item"))?;

        info!(
            %user_id,
            product_id = %request.product_id,
            quantity = request.quantity,
            "cart: item added"
        );

        self.get_cart(user_id).await
    }

    pub async fn update_item(
        &self,
        user_id: Uuid,
        cart_item_id: Uuid,
        request: UpdateCartItemRequest,
    ) -> UseCaseResult<CartDto> {
        if request.quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let cart = self
            .cart_repo
            .find_by_user(user_id)
            .await
            .map_err(internal(user_id, "find_by_user"))?
            .ok_or(CartError::ItemNotFound)?;

        let updated = self
            .cart_repo
            .update_item_quantity(cart.id, cart_item_id, request.quantity)
            .await
            .map_err(internal(user_id, "update_item_quantity"))?;
        if !updated {
            return Err(CartError::ItemNotFound);
        }

        self.get_cart(user_id).await
    }

    pub async fn remove_item(&self, user_id: Uuid, cart_item_id: Uuid) -> UseCaseResult<CartDto> {
        let cart = self
            .cart_repo
            .find_by_user(user_id)
            .await
            .map_err(internal(user_id, "find_by_user"))?
            .ok_or(CartError::ItemNotFound)?;

        let removed = self
            .cart_repo
            .remove_item(cart.id, cart_item_id)
            .await
            .map_err(internal(user_id, "remove_item"))?;
        if !removed {
            return Err(CartError::ItemNotFound);
        }

        info!(%user_id, %cart_item_id, "cart: item removed");
        self.get_cart(user_id).await
    }

    pub async fn clear(&self, user_id: Uuid) -> UseCaseResult<()> {
        let cart = self
            .cart_repo
            .find_by_user(user_id)
            .await
            .map_err(internal(user_id, "find_by_user"))?
            .ok_or(CartError::CartNotFound)?;

        self.cart_repo
            .clear(cart.id)
            .await
            .map_err(internal(user_id, "clear"))?;

        info!(%user_id, cart_id = %cart.id, "cart: cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use storefront::domain::{
        entities::{carts::CartEntity, products::ProductEntity},
        repositories::{carts::MockCartRepository, products::MockProductRepository},
        value_objects::carts::CartLine,
    };

    fn sample_cart(user_id: Uuid) -> CartEntity {
        CartEntity {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_product(id: Uuid, price_minor: i64) -> ProductEntity {
        ProductEntity {
            id,
            name: "Classic T-Shirt".to_string(),
            description: "Cotton".to_string(),
            price_minor,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn add_item_then_returns_priced_cart() {
        let user_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let cart = sample_cart(user_id);

        let mut products = MockProductRepository::new();
        products
            .expect_find_by_id()
            .returning(move |id| Ok(Some(sample_product(id, 1000))));

        let mut carts = MockCartRepository::new();
        let returned = cart.clone();
        carts
            .expect_get_or_create()
            .times(2)
            .returning(move |_| Ok(returned.clone()));
        carts
            .expect_add_item()
            .times(1)
            .returning(move |_, added_product, quantity| {
                assert_eq!(added_product, product_id);
                assert_eq!(quantity, 2);
                Ok(())
            });
        carts.expect_lines().returning(move |_| {
            Ok(vec![CartLine {
                cart_item_id: Uuid::new_v4(),
                product_id,
                product_name: "Classic T-Shirt".to_string(),
                product_price_minor: 1000,
                product_image_url: None,
                quantity: 2,
            }])
        });

        let usecase = CartUseCase::new(Arc::new(carts), Arc::new(products));
        let dto = usecase
            .add_item(
                user_id,
                AddToCartRequest {
                    product_id,
                    quantity: 2,
                },
            )
            .await
            .unwrap();

        assert_eq!(dto.cart_id, cart.id);
        assert_eq!(dto.total_amount_minor, 2000);
        assert_eq!(dto.total_items, 2);
    }

    #[tokio::test]
    async fn add_missing_product_is_not_found() {
        let mut products = MockProductRepository::new();
        products.expect_find_by_id().returning(|_| Ok(None));

        let usecase = CartUseCase::new(Arc::new(MockCartRepository::new()), Arc::new(products));
        let err = usecase
            .add_item(
                Uuid::new_v4(),
                AddToCartRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let usecase = CartUseCase::new(
            Arc::new(MockCartRepository::new()),
            Arc::new(MockProductRepository::new()),
        );

        let err = usecase
            .update_item(
                Uuid::new_v4(),
                Uuid::new_v4(),
                UpdateCartItemRequest { quantity: 0 },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::InvalidQuantity));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn foreign_item_is_not_found() {
        let user_id = Uuid::new_v4();
        let cart = sample_cart(user_id);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find_by_user()
            .returning(move |_| Ok(Some(cart.clone())));
        carts
            .expect_remove_item()
            .returning(|_, _| Ok(false));

        let usecase = CartUseCase::new(Arc::new(carts), Arc::new(MockProductRepository::new()));
        let err = usecase
            .remove_item(user_id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[tokio::test]
    async fn clearing_without_cart_is_not_found() {
        let mut carts = MockCartRepository::new();
        carts.expect_find_by_user().returning(|_| Ok(None));

        let usecase = CartUseCase::new(Arc::new(carts), Arc::new(MockProductRepository::new()));
        let err = usecase.clear(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, CartError::CartNotFound));
    }
}
