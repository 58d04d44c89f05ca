use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::AccessDenied(format!("Requires {role} role")));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

/// Validates a bearer token and extracts the caller.
pub fn authenticate(authorization: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token = authorization
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::AccessDenied("Invalid Authorization scheme".into()))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AccessDenied("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::AccessDenied("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::AccessDenied("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::AccessDenied("Invalid Authorization header".into()))?;

        authenticate(auth_str, &state.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(user_id: Uuid, role: &str, secret: &str, exp: usize) -> String {
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize
    }

    #[test]
    fn accepts_valid_bearer_token() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, ROLE_USER, "secret", far_future());

        let user = authenticate(&format!("Bearer {token}"), "secret").unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, ROLE_USER);
    }

    #[test]
    fn rejects_wrong_secret_and_scheme() {
        let token = token_for(Uuid::new_v4(), ROLE_USER, "secret", far_future());

        assert!(matches!(
            authenticate(&format!("Bearer {token}"), "other"),
            Err(AppError::AccessDenied(_))
        ));
        assert!(matches!(
            authenticate(&format!("Basic {token}"), "secret"),
            Err(AppError::AccessDenied(_))
        ));
    }

    #[test]
    fn admin_check_denies_plain_users() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: ROLE_USER.into(),
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::AccessDenied(_))));

        let admin = AuthUser {
            role: ROLE_ADMIN.into(),
            ..user
        };
        assert!(ensure_admin(&admin).is_ok());
    }
}
