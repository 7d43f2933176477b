use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dto::auth::Claims,
    entity::sea_orm_active_enums::Role,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

/// Sign a bearer token for `user_id` that expires after the configured TTL.
pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(config: &AppConfig, token: &str) -> AppResult<AuthUser> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

fn bearer_token(parts: &Parts) -> Option<Result<&str, AppError>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;
    let token = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized)
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(AppError::Unauthorized)
        });
    Some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AppConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)??;
        let config = Arc::<AppConfig>::from_ref(state);
        verify_token(&config, token)
    }
}

/// A missing header yields `None`; a present but invalid token is still rejected.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    Arc<AppConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(None),
            Some(token) => {
                let config = Arc::<AppConfig>::from_ref(state);
                verify_token(&config, token?).map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::http::Request;

    use super::*;

    fn config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 24,
            upload_dir: PathBuf::from("uploads"),
            max_body_bytes: 1024,
        })
    }

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id, Role::Admin).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let user = <AuthUser as FromRequestParts<_>>::from_request_parts(&mut parts, &config)
            .await
            .unwrap();
        assert_eq!(user.user_id, user_id);
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_unauthorized() {
        let config = config();

        let mut parts = parts_with(None);
        let err = <AuthUser as FromRequestParts<_>>::from_request_parts(&mut parts, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        let mut parts = parts_with(Some("Bearer not-a-jwt"));
        let err = <AuthUser as FromRequestParts<_>>::from_request_parts(&mut parts, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        let mut parts = parts_with(Some("Basic abc"));
        let err = <AuthUser as FromRequestParts<_>>::from_request_parts(&mut parts, &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn optional_extractor_allows_anonymous() {
        let config = config();
        let mut parts = parts_with(None);
        let user =
            <AuthUser as OptionalFromRequestParts<_>>::from_request_parts(&mut parts, &config)
                .await
                .unwrap();
        assert!(user.is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = config();
        let mut other = (*config).clone();
        other.jwt_secret = "another-secret".into();
        let token = issue_token(&other, Uuid::new_v4(), Role::Customer).unwrap();
        assert!(matches!(verify_token(&config, &token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn customers_are_forbidden_from_admin_actions() {
        let customer = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert!(matches!(ensure_admin(&customer), Err(AppError::Forbidden)));

        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(ensure_admin(&admin).is_ok());
    }
}
