//! Authentication middleware
//!
//! Token validation and role-based access control. Credential verification
//! and token issuance belong to the external authentication service; this
//! middleware only consumes the resolved `(user_id, role)` claims.

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::Role;

use crate::error::{AppError, AppResult, ErrorResponse};

/// Authenticated user information extracted from the token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_order_manager(&self) -> bool {
        self.role.is_order_manager()
    }

    pub fn is_stock_manager(&self) -> bool {
        self.role.is_stock_manager()
    }

    pub fn is_vendor(&self) -> bool {
        self.role.is_vendor()
    }
}

/// Authentication middleware that validates bearer tokens
/// Note: the token is validated inline against the environment secret to
/// avoid state dependency issues in the middleware layer.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let auth_user = match authenticate_token(token) {
        Ok(user) => user,
        Err(err) => {
            return err.into_response();
        }
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Validate a token and resolve the authenticated user.
///
/// Shared by the HTTP middleware and the WebSocket endpoint (where the
/// token arrives as a query parameter).
pub fn authenticate_token(token: &str) -> AppResult<AuthUser> {
    let secret = jwt_secret();
    let claims = decode_jwt(token, &secret)?;

    let user_id = uuid::Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let role: Role = claims.role.parse().map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser { user_id, role })
}

/// JWT secret from environment (fallback for development)
fn jwt_secret() -> String {
    std::env::var("DDM__JWT__SECRET")
        .or_else(|_| std::env::var("DDM_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string())
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
    iat: i64,
}

/// Decode and validate a JWT token
fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: crate::error::ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_fr: "Non autorisé".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_fr: "Authentification requise".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Guard: order and sale status mutations
pub fn require_order_manager(user: &AuthUser) -> AppResult<()> {
    if user.is_order_manager() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Guard: product and stock mutations
pub fn require_stock_manager(user: &AuthUser) -> AppResult<()> {
    if user.is_stock_manager() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn vendors_cannot_pass_manager_guards() {
        let vendor = user(Role::Vendeur);
        assert!(require_order_manager(&vendor).is_err());
        assert!(require_stock_manager(&vendor).is_err());
    }

    #[test]
    fn admin_passes_every_guard() {
        let admin = user(Role::Admin);
        assert!(require_order_manager(&admin).is_ok());
        assert!(require_stock_manager(&admin).is_ok());
    }

    #[test]
    fn managers_are_scoped_to_their_domain() {
        assert!(require_order_manager(&user(Role::GestionnaireCommandes)).is_ok());
        assert!(require_stock_manager(&user(Role::GestionnaireCommandes)).is_err());
        assert!(require_stock_manager(&user(Role::GestionnaireStocks)).is_ok());
        assert!(require_order_manager(&user(Role::GestionnaireStocks)).is_err());
    }
}
