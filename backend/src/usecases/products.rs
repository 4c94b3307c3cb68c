use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use storefront::domain::{
    entities::products::{InsertProductEntity, UpdateProductEntity},
    repositories::{products::ProductRepository, storage::ImageStorageClient},
    value_objects::{
        images::{ImageRejection, ImageUpload},
        products::{ProductDto, ProductFilter, ProductForm, ProductListQuery, ProductPageDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid product: {0}")]
    Validation(String),
    #[error(transparent)]
    InvalidImage(#[from] ImageRejection),
    #[error("product id in body does not match the route")]
    IdMismatch,
    #[error("product not found")]
    NotFound,
    #[error("image upload failed")]
    ImageUpload(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_)
            | CatalogError::InvalidImage(_)
            | CatalogError::IdMismatch => StatusCode::BAD_REQUEST,
            CatalogError::NotFound => StatusCode::NOT_FOUND,
            CatalogError::ImageUpload(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => AppError::NotFound(err.to_string()),
            CatalogError::ImageUpload(_) => AppError::BadGateway(err.to_string()),
            CatalogError::Internal(inner) => AppError::Internal(inner),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CatalogError>;

pub struct CatalogUseCase<P, I>
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    product_repo: Arc<P>,
    image_storage: Arc<I>,
}

impl<P, I> CatalogUseCase<P, I>
where
    P: ProductRepository + Send + Sync + 'static,
    I: ImageStorageClient + Send + Sync + 'static,
{
    pub fn new(product_repo: Arc<P>, image_storage: Arc<I>) -> Self {
        Self {
            product_repo,
            image_storage,
        }
    }

    pub async fn list_products(&self, query: ProductListQuery) -> UseCaseResult<ProductPageDto> {
        let filter = ProductFilter::from(query);
        let listing = self.product_repo.list(filter.clone()).await.map_err(|err| {
            error!(db_error = ?err, "products: failed to list products");
            CatalogError::Internal(err)
        })?;

        Ok(ProductPageDto::new(listing, &filter))
    }

    pub async fn get_product(&self, product_id: Uuid) -> UseCaseResult<ProductDto> {
        let product = self
            .product_repo
            .find_by_id(product_id)
            .await
            .map_err(|err| {
                error!(%product_id, db_error = ?err, "products: failed to load product");
                CatalogError::Internal(err)
            })?;

        product.map(ProductDto::from).ok_or(CatalogError::NotFound)
    }

    /// Validates the form and image, then uploads the image. The uploaded
    /// file takes precedence over a submitted URL.
    async fn resolve_image_url(
        &self,
        form: &ProductForm,
        image: Option<ImageUpload>,
    ) -> UseCaseResult<Option<String>> {
        form.validate()
            .map_err(|err| CatalogError::Validation(err.to_string()))?;

        let Some(image) = image else {
            return Ok(form.image_url.clone());
        };

        image.validate().inspect_err(|rejection| {
            warn!(file_name = %image.file_name, %rejection, "products: image rejected");
        })?;

        let url = self.image_storage.upload_image(image).await.map_err(|err| {
            error!(error = ?err, "products: image upload failed");
            CatalogError::ImageUpload(err)
        })?;

        Ok(Some(url))
    }

    pub async fn create_product(
        &self,
        form: ProductForm,
        image: Option<ImageUpload>,
    ) -> UseCaseResult<ProductDto> {
        let image_url = self.resolve_image_url(&form, image).await?;
        let now = Utc::now();

        let created = self
            .product_repo
            .create(InsertProductEntity {
                name: form.name,
                description: form.description,
                price_minor: form.price_minor,
                image_url,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "products: failed to create product");
                CatalogError::Internal(err)
            })?;

        info!(product_id = %created.id, "products: product created");
        Ok(ProductDto::from(created))
    }

    pub async fn update_product(
        &self,
        product_id: Uuid,
        body_id: Option<Uuid>,
        form: ProductForm,
        image: Option<ImageUpload>,
    ) -> UseCaseResult<()> {
        if body_id.is_some_and(|id| id != product_id) {
            return Err(CatalogError::IdMismatch);
        }

        let image_url = self.resolve_image_url(&form, image).await?;

        let updated = self
            .product_repo
            .update(
                product_id,
                UpdateProductEntity {
                    name: form.name,
                    description: form.description,
                    price_minor: form.price_minor,
                    image_url,
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(|err| {
                error!(%product_id, db_error = ?err, "products: failed to update product");
                CatalogError::Internal(err)
            })?;

        if updated.is_none() {
            return Err(CatalogError::NotFound);
        }

        info!(%product_id, "products: product updated");
        Ok(())
    }

    pub async fn delete_product(&self, product_id: Uuid) -> UseCaseResult<()> {
        let deleted = self.product_repo.delete(product_id).await.map_err(|err| {
            error!(%product_id, db_error = ?err, "products: failed to delete product");
            CatalogError::Internal(err)
        })?;

        if !deleted {
            return Err(CatalogError::NotFound);
        }

        info!(%product_id, "products: product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront::domain::{
        entities::products::ProductEntity,
        repositories::{products::MockProductRepository, storage::MockImageStorageClient},
        value_objects::products::ProductListing,
    };

    fn form(image_url: Option<&str>) -> ProductForm {
        ProductForm {
            name: "Denim Jacket".to_string(),
            description: "Stylish denim jacket".to_string(),
            price_minor: 8999,
            image_url: image_url.map(str::to_string),
        }
    }

    fn image(file_name: &str, size: usize) -> ImageUpload {
        ImageUpload {
            file_name: file_name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![1u8; size],
        }
    }

    fn entity_from(insert: InsertProductEntity) -> ProductEntity {
        ProductEntity {
            id: Uuid::new_v4(),
            name: insert.name,
            description: insert.description,
            price_minor: insert.price_minor,
            image_url: insert.image_url,
            created_at: insert.created_at,
            updated_at: insert.updated_at,
        }
    }

    #[tokio::test]
    async fn uploaded_file_wins_over_url() {
        let mut storage = MockImageStorageClient::new();
        storage
            .expect_upload_image()
            .times(1)
            .returning(|_| Ok("https://res.cloudinary.com/demo/jacket.png".to_string()));

        let mut repo = MockProductRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|insert| Ok(entity_from(insert)));

        let usecase = CatalogUseCase::new(Arc::new(repo), Arc::new(storage));
        let product = usecase
            .create_product(
                form(Some("https://example.com/old.png")),
                Some(image("jacket.png", 100)),
            )
            .await
            .unwrap();

        assert_eq!(
            product.image_url.as_deref(),
            Some("https://res.cloudinary.com/demo/jacket.png")
        );
    }

    #[tokio::test]
    async fn invalid_image_is_rejected_before_upload() {
        // No storage or repository expectations.
        let usecase = CatalogUseCase::new(
            Arc::new(MockProductRepository::new()),
            Arc::new(MockImageStorageClient::new()),
        );

        let err = usecase
            .create_product(form(None), Some(image("payload.exe", 10)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidImage(ImageRejection::UnsupportedExtension)
        ));

        let err = usecase
            .create_product(form(None), Some(image("empty.png", 0)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_form_is_rejected() {
        let usecase = CatalogUseCase::new(
            Arc::new(MockProductRepository::new()),
            Arc::new(MockImageStorageClient::new()),
        );

        let mut bad = form(None);
        bad.price_minor = 0;

        let err = usecase.create_product(bad, None).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_failure_is_bad_gateway() {
        let mut storage = MockImageStorageClient::new();
        storage
            .expect_upload_image()
            .returning(|_| Err(anyhow::anyhow!("cloudinary 500")));

        let usecase = CatalogUseCase::new(Arc::new(MockProductRepository::new()), Arc::new(storage));
        let err = usecase
            .create_product(form(None), Some(image("a.png", 10)))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn update_keeps_image_when_none_supplied() {
        let mut repo = MockProductRepository::new();
        repo.expect_update().times(1).returning(|id, changes| {
            assert_eq!(changes.image_url, None);
            Ok(Some(ProductEntity {
                id,
                name: changes.name,
                description: changes.description,
                price_minor: changes.price_minor,
                image_url: Some("https://example.com/kept.png".to_string()),
                created_at: Utc::now(),
                updated_at: changes.updated_at,
            }))
        });

        let usecase = CatalogUseCase::new(Arc::new(repo), Arc::new(MockImageStorageClient::new()));
        assert!(
            usecase
                .update_product(Uuid::new_v4(), None, form(None), None)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn update_with_mismatched_id_is_rejected() {
        let usecase = CatalogUseCase::new(
            Arc::new(MockProductRepository::new()),
            Arc::new(MockImageStorageClient::new()),
        );

        let err = usecase
            .update_product(Uuid::new_v4(), Some(Uuid::new_v4()), form(None), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::IdMismatch));
    }

    #[tokio::test]
    async fn delete_missing_product_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let usecase = CatalogUseCase::new(Arc::new(repo), Arc::new(MockImageStorageClient::new()));
        let err = usecase.delete_product(Uuid::new_v4()).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_passes_normalised_filter() {
        let mut repo = MockProductRepository::new();
        repo.expect_list().times(1).returning(|filter| {
            assert_eq!(filter.page_size, 100);
            assert_eq!(filter.page_number, 1);
            Ok(ProductListing {
                products: vec![],
                total_count: 0,
            })
        });

        let usecase = CatalogUseCase::new(Arc::new(repo), Arc::new(MockImageStorageClient::new()));
        let page = usecase
            .list_products(ProductListQuery {
                page_size: Some(1000),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }
}
