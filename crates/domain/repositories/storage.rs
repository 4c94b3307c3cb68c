use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::images::ImageUpload;

#[automock]
#[async_trait]
pub trait ImageStorageClient {
    /// Uploads an already validated image and returns its public URL.
    async fn upload_image(&self, image: ImageUpload) -> Result<String>;
}
