use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use storefront::domain::{
    entities::users::InsertUserEntity,
    repositories::users::UserRepository,
    value_objects::iam::{
        AuthResponse, CurrentUserDto, LoginRequest, RegisterRequest, normalize_email,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{PasswordHasher, TokenAuthority},
    axum_http::error_responses::AppError,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("email is already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::EmailTaken => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::Internal(inner) => AppError::Internal(inner),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AuthError>;

pub struct AuthUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    password_hasher: Arc<dyn PasswordHasher>,
    token_authority: Arc<dyn TokenAuthority>,
}

impl<U> AuthUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(
        user_repo: Arc<U>,
        password_hasher: Arc<dyn PasswordHasher>,
        token_authority: Arc<dyn TokenAuthority>,
    ) -> Self {
        Self {
            user_repo,
            password_hasher,
            token_authority,
        }
    }

    fn issue_response(
        &self,
        user_id: Uuid,
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> UseCaseResult<AuthResponse> {
        let issued = self.token_authority.issue(user_id, &email).map_err(|err| {
            error!(%user_id, error = ?err, "auth: failed to issue token");
            AuthError::Internal(err)
        })?;

        Ok(AuthResponse {
            token: issued.token,
            email,
            user_id,
            first_name,
            last_name,
            expiration: issued.expires_at,
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> UseCaseResult<AuthResponse> {
        request
            .validate()
            .map_err(|err| AuthError::Validation(err.to_string()))?;

        let email = normalize_email(&request.email);

        let existing = self.user_repo.find_by_email(&email).await.map_err(|err| {
            error!(db_error = ?err, "auth: failed to look up email");
            AuthError::Internal(err)
        })?;
        if existing.is_some() {
            warn!("auth: registration with existing email rejected");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.password_hasher.hash(&request.password)?;
        let now = Utc::now();

        let created = self
            .user_repo
            .create(InsertUserEntity {
                email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: failed to create user");
                AuthError::Internal(err)
            })?
            .ok_or(AuthError::EmailTaken)?;

        info!(user_id = %created.id, "auth: user registered");
        self.issue_response(created.id, created.email, created.first_name, created.last_name)
    }

    pub async fn login(&self, request: LoginRequest) -> UseCaseResult<AuthResponse> {
        request
            .validate()
            .map_err(|err| AuthError::Validation(err.to_string()))?;

        let email = normalize_email(&request.email);
        let user = self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "auth: failed to look up email");
                AuthError::Internal(err)
            })?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = self
            .password_hasher
            .verify(&request.password, &user.password_hash)?;
        if !matches {
            warn!(user_id = %user.id, "auth: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, "auth: user logged in");
        self.issue_response(user.id, user.email, user.first_name, user.last_name)
    }

    pub async fn current_user(&self, user_id: Uuid) -> UseCaseResult<CurrentUserDto> {
        let user = self.user_repo.find_by_id(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "auth: failed to load user");
            AuthError::Internal(err)
        })?;

        user.map(CurrentUserDto::from).ok_or(AuthError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{Argon2PasswordHasher, JwtTokenAuthority},
        config::config_model::Jwt,
    };
    use storefront::domain::{entities::users::UserEntity, repositories::users::MockUserRepository};

    fn token_authority() -> Arc<JwtTokenAuthority> {
        Arc::new(JwtTokenAuthority::new(&Jwt {
            secret: "supersecretjwtsecretforunittesting123".to_string(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            expiration_minutes: 60,
        }))
    }

    fn usecase(repo: MockUserRepository) -> AuthUseCase<MockUserRepository> {
        AuthUseCase::new(
            Arc::new(repo),
            Arc::new(Argon2PasswordHasher),
            token_authority(),
        )
    }

    fn sample_user(password: &str) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            email: "shopper@example.com".to_string(),
            password_hash: Argon2PasswordHasher.hash(password).unwrap(),
            first_name: Some("Ada".to_string()),
            last_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    #[tokio::test]
    async fn register_normalises_email_and_issues_token() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|email| {
            assert_eq!(email, "shopper@example.com");
            Ok(None)
        });
        repo.expect_create().times(1).returning(|insert| {
            assert!(insert.password_hash.starts_with("$argon2"));
            Ok(Some(UserEntity {
                id: Uuid::new_v4(),
                email: insert.email,
                password_hash: insert.password_hash,
                first_name: insert.first_name,
                last_name: insert.last_name,
                created_at: insert.created_at,
                updated_at: insert.updated_at,
            }))
        });

        let response = usecase(repo)
            .register(register_request("Shopper@Example.com"))
            .await
            .unwrap();

        assert_eq!(response.email, "shopper@example.com");
        assert!(!response.token.is_empty());
        let user = token_authority().verify(&response.token).unwrap();
        assert_eq!(user.user_id, response.user_id);
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(sample_user("secret1"))));

        let err = usecase(repo)
            .register(register_request("shopper@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_mismatched_confirmation() {
        let mut request = register_request("shopper@example.com");
        request.confirm_password = "different".to_string();

        let err = usecase(MockUserRepository::new())
            .register(request)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let user = sample_user("secret1");
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let err = usecase(repo)
            .login(LoginRequest {
                email: "shopper@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_with_unknown_email_is_unauthorized() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));

        let err = usecase(repo)
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_succeeds() {
        let user = sample_user("secret1");
        let user_id = user.id;
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let response = usecase(repo)
            .login(LoginRequest {
                email: "SHOPPER@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.user_id, user_id);
        assert_eq!(response.first_name.as_deref(), Some("Ada"));
    }
}
