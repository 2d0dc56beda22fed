use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::policy::{EmployeeRole, Principal, Role, Tier};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived, sent as a bearer token on API calls
    Access,
    /// Long-lived, only accepted by the refresh endpoint
    Refresh,
}

/// JWT claims carrying everything the policy needs about the caller
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_role: Option<EmployeeRole>,
    pub token_type: TokenType,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(principal: &Principal, token_type: TokenType, expiration_hours: i64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        Self {
            sub: principal.user_id.clone(),
            role: principal.role,
            tenant_id: principal.tenant_id.clone(),
            tier: principal.tier,
            employee_role: principal.employee_role,
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub.clone(),
            role: self.role,
            tenant_id: self.tenant_id.clone(),
            tier: self.tier,
            employee_role: self.employee_role,
        }
    }
}

/// Generates a signed JWT for `principal`
pub fn generate_token(
    principal: &Principal,
    token_type: TokenType,
    secret: &str,
    expiration_hours: i64,
) -> AppResult<String> {
    let claims = Claims::new(principal, token_type, expiration_hours);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal {
        source: anyhow::anyhow!("Failed to generate JWT token: {}", e),
    })
}

/// Generates both access and refresh tokens
///
/// # Returns
/// A tuple of (access_token, refresh_token)
pub fn generate_token_pair(
    principal: &Principal,
    secret: &str,
    access_expiration_hours: i64,
    refresh_expiration_hours: i64,
) -> AppResult<(String, String)> {
    let access_token = generate_token(
        principal,
        TokenType::Access,
        secret,
        access_expiration_hours,
    )?;
    let refresh_token = generate_token(
        principal,
        TokenType::Refresh,
        secret,
        refresh_expiration_hours,
    )?;

    Ok((access_token, refresh_token))
}

/// Validates a JWT token and returns the claims
///
/// When `expected_type` is given, a token of the other type is rejected.
pub fn validate_token(
    token: &str,
    secret: &str,
    expected_type: Option<TokenType>,
) -> AppResult<Claims> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Unauthorized {
            message: "Token has expired".to_string(),
        },
        jsonwebtoken::errors::ErrorKind::InvalidToken => AppError::Unauthorized {
            message: "Invalid token".to_string(),
        },
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AppError::Unauthorized {
            message: "Invalid token signature".to_string(),
        },
        _ => AppError::Unauthorized {
            message: format!("Token validation failed: {}", e),
        },
    })?;

    if let Some(expected) = expected_type
        && claims.token_type != expected
    {
        return Err(AppError::Unauthorized {
            message: format!(
                "Invalid token type: expected {:?}, got {:?}",
                expected, claims.token_type
            ),
        });
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    validate_token(token, secret, Some(TokenType::Access))
}

pub fn validate_refresh_token(token: &str, secret: &str) -> AppResult<Claims> {
    validate_token(token, secret, Some(TokenType::Refresh))
}
