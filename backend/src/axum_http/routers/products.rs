use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use storefront::{
    domain::{
        repositories::{products::ProductRepository, storage::ImageStorageClient},
        value_objects::{
            images::ImageUpload,
            products::{ProductForm, ProductListQuery},
        },
    },
    infra::{
        db::{postgres::postgres_connection::PgPoolSquad, repositories::products::ProductPostgres},
        storages::cloudinary::CloudinaryStorageClient,
    },
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::products::CatalogUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>, image_storage: Arc<CloudinaryStorageClient>) -> Router {
    let product_repository = ProductPostgres::new(Arc::clone(&db_pool));
    let usecase = CatalogUseCase::new(Arc::new(product_repository), image_storage);

    router(Arc::new(usecase))
}

pub fn router<P, I>(usecase: Arc<CatalogUseCase<P, I>>) -> Router
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    // Multipart uploads are bounded by the server-wide RequestBodyLimitLayer.
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::disable())
        .with_state(usecase)
}

/// Fields collected from a product multipart submission.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price_minor: Option<i64>,
    pub image_url: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProductSubmission {
    pub fn into_form(self) -> Result<(Option<Uuid>, ProductForm, Option<ImageUpload>), AppError> {
        let price_minor = self
            .price_minor
            .ok_or_else(|| AppError::BadRequest("price_minor is required".to_string()))?;

        let form = ProductForm {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price_minor,
            image_url: self.image_url,
        };

        Ok((self.id, form, self.image))
    }
}

pub async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut submission = ProductSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image_file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| AppError::BadRequest(format!("invalid image part: {err}")))?;

            // Browsers send an empty part when no file was picked.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }

            submission.image = Some(ImageUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| AppError::BadRequest(format!("invalid field {name}: {err}")))?;

        match name.as_str() {
            "name" => submission.name = value,
            "description" => submission.description = value,
            "price_minor" => {
                let price = value.trim().parse::<i64>().map_err(|_| {
                    AppError::BadRequest("price_minor must be an integer".to_string())
                })?;
                submission.price_minor = Some(price);
            }
            "image_url" => {
                let url = value.trim();
                submission.image_url = (!url.is_empty()).then(|| url.to_string());
            }
            "id" => {
                let id = Uuid::parse_str(value.trim())
                    .map_err(|_| AppError::BadRequest("id must be a valid UUID".to_string()))?;
                submission.id = Some(id);
            }
            other => warn!(field = other, "products: ignoring unknown multipart field"),
        }
    }

    Ok(submission)
}

pub async fn list_products<P, I>(
    State(usecase): State<Arc<CatalogUseCase<P, I>>>,
    Query(query): Query<ProductListQuery>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    match usecase.list_products(query).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn get_product<P, I>(
    State(usecase): State<Arc<CatalogUseCase<P, I>>>,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    match usecase.get_product(product_id).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn create_product<P, I>(
    State(usecase): State<Arc<CatalogUseCase<P, I>>>,
    AuthUser { user_id, .. }: AuthUser,
    multipart: Multipart,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    info!(%user_id, "products: create request received");

    let (_, form, image) = match read_submission(multipart)
        .await
        .and_then(ProductSubmission::into_form)
    {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    match usecase.create_product(form, image).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_product<P, I>(
    State(usecase): State<Arc<CatalogUseCase<P, I>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(product_id): Path<Uuid>,
    multipart: Multipart,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    info!(%user_id, %product_id, "products: update request received");

    let (body_id, form, image) = match read_submission(multipart)
        .await
        .and_then(ProductSubmission::into_form)
    {
        Ok(parts) => parts,
        Err(err) => return err.into_response(),
    };

    match usecase
        .update_product(product_id, body_id, form, image)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn delete_product<P, I>(
    State(usecase): State<Arc<CatalogUseCase<P, I>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    info!(%user_id, %product_id, "products: delete request received");

    match usecase.delete_product(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtTokenAuthority, SharedTokenAuthority, TokenAuthority};
    use crate::config::config_model::Jwt;
    use axum::{Extension, body::Body, http::Request};
    use storefront::domain::repositories::{
        products::MockProductRepository, storage::MockImageStorageClient,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-STOREFRONT-BOUNDARY";

    fn authority() -> SharedTokenAuthority {
        Arc::new(JwtTokenAuthority::new(&Jwt {
            secret: "supersecretjwtsecretforunittesting123".to_string(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            expiration_minutes: 60,
        }))
    }

    fn app(products: MockProductRepository, storage: MockImageStorageClient) -> Router {
        let usecase = CatalogUseCase::new(Arc::new(products), Arc::new(storage));
        router(Arc::new(usecase)).layer(Extension(authority()))
    }

    fn multipart_body(fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn authorized_multipart(method: &str, uri: &str, body: String) -> Request<Body> {
        let token = authority().issue(Uuid::new_v4(), "admin@example.com").unwrap();
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token.token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn create_requires_token() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(&[("name", "Mug")])))
            .unwrap();

        let response = app(MockProductRepository::new(), MockImageStorageClient::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_non_numeric_price() {
        let body = multipart_body(&[
            ("name", "Mug"),
            ("description", "Ceramic"),
            ("price_minor", "12.50"),
        ]);

        let response = app(MockProductRepository::new(), MockImageStorageClient::new())
            .oneshot(authorized_multipart("POST", "/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_returns_created() {
        let mut products = MockProductRepository::new();
        products.expect_create().times(1).returning(|insert| {
            assert_eq!(insert.price_minor, 1250);
            assert_eq!(insert.image_url.as_deref(), Some("https://img.example.com/mug.png"));
            Ok(storefront::domain::entities::products::ProductEntity {
                id: Uuid::new_v4(),
                name: insert.name,
                description: insert.description,
                price_minor: insert.price_minor,
                image_url: insert.image_url,
                created_at: insert.created_at,
                updated_at: insert.updated_at,
            })
        });

        let body = multipart_body(&[
            ("name", "Mug"),
            ("description", "Ceramic"),
            ("price_minor", "1250"),
            ("image_url", "https://img.example.com/mug.png"),
        ]);

        let response = app(products, MockImageStorageClient::new())
            .oneshot(authorized_multipart("POST", "/", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn update_with_mismatched_id_is_bad_request() {
        let path_id = Uuid::new_v4();
        let other_id = Uuid::new_v4().to_string();
        let body = multipart_body(&[
            ("id", other_id.as_str()),
            ("name", "Mug"),
            ("description", "Ceramic"),
            ("price_minor", "1250"),
        ]);

        let response = app(MockProductRepository::new(), MockImageStorageClient::new())
            .oneshot(authorized_multipart("PUT", &format!("/{path_id}"), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_missing_product_is_not_found() {
        let mut products = MockProductRepository::new();
        products.expect_find_by_id().returning(|_| Ok(None));

        let response = app(products, MockImageStorageClient::new())
            .oneshot(
                Request::builder()
                    .uri(format!("/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
