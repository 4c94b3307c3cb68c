use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{InsertUserEntity, UserEntity};

#[automock]
#[async_trait]
pub trait UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;

    /// Returns `None` when the email is already registered.
    async fn create(&self, user: InsertUserEntity) -> Result<Option<UserEntity>>;
}
