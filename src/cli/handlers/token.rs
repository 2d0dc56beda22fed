//! Token command handler: mint a token pair without going through the API

use crate::api::dto::TokenResponse;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::policy::Principal;
use crate::utils::jwt::generate_token_pair;

pub struct TokenCommandHandler {
    config: Settings,
}

impl TokenCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub fn execute(&self, principal: &Principal) -> AppResult<TokenResponse> {
        let jwt = &self.config.jwt;
        let (access_token, refresh_token) = generate_token_pair(
            principal,
            &jwt.secret,
            jwt.access_token_expiration,
            jwt.refresh_token_expiration,
        )?;
        tracing::info!(
            user_id = %principal.user_id,
            role = %principal.role,
            "Issued token pair from the command line"
        );

        let response =
            TokenResponse::bearer(access_token, refresh_token, jwt.access_token_expiration);
        let rendered = serde_json::to_string_pretty(&response).map_err(AppError::internal)?;
        println!("{}", rendered);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Role, Tier};
    use crate::utils::jwt::{validate_access_token, validate_refresh_token};

    const SECRET: &str = "an-adequately-long-test-secret-value";

    #[test]
    fn test_issued_tokens_carry_principal() {
        let mut config = Settings::default();
        config.jwt.secret = SECRET.to_string();
        let principal = Principal::new("ops-1", Role::Admin)
            .with_tenant("acme")
            .with_tier(Tier::Tier2);

        let response = TokenCommandHandler::new(config).execute(&principal).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);

        let claims = validate_access_token(&response.access_token, SECRET).unwrap();
        assert_eq!(claims.principal(), principal);
        assert!(validate_refresh_token(&response.refresh_token, SECRET).is_ok());
        assert!(validate_access_token(&response.refresh_token, SECRET).is_err());
    }
}
