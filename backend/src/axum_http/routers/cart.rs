use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;
use storefront::{
    domain::{
        repositories::{carts::CartRepository, products::ProductRepository},
        value_objects::carts::{AddToCartRequest, UpdateCartItemRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{carts::CartPostgres, products::ProductPostgres},
    },
};
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::cart::CartUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let cart_repository = CartPostgres::new(Arc::clone(&db_pool));
    let product_repository = ProductPostgres::new(Arc::clone(&db_pool));
    let usecase = CartUseCase::new(Arc::new(cart_repository), Arc::new(product_repository));

    router(Arc::new(usecase))
}

pub fn router<C, P>(usecase: Arc<CartUseCase<C, P>>) -> Router
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_item))
        .route("/item/:cart_item_id", put(update_item).delete(remove_item))
        .route("/clear", delete(clear_cart))
        .with_state(usecase)
}

pub async fn get_cart<C, P>(
    State(usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    match usecase.get_cart(user_id).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn add_item<C, P>(
    State(usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<AddToCartRequest>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    match usecase.add_item(user_id, request).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_item<C, P>(
    State(usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(cart_item_id): Path<Uuid>,
    Json(request): Json<UpdateCartItemRequest>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    match usecase.update_item(user_id, cart_item_id, request).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn remove_item<C, P>(
    State(usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(cart_item_id): Path<Uuid>,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    match usecase.remove_item(user_id, cart_item_id).await {
        Ok(cart) => Json(cart).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn clear_cart<C, P>(
    State(usecase): State<Arc<CartUseCase<C, P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    C: CartRepository + Send + Sync + 'static,
    P: ProductRepository + Send + Sync + 'static,
{
    match usecase.clear(user_id).await {
        Ok(()) => Json(json!({ "message": "Cart cleared successfully" })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
