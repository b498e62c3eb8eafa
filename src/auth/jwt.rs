use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Claims of the access tokens minted by the external identity service.
/// This API only verifies and reads them; it never issues tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn config_with_secret(secret: &str) -> Config {
        Config {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: String::new(),
            jwt_secret: secret.into(),
            max_range_days: 366,
            statistics_timeout_secs: 10,
        }
    }

    fn token_for(sub: Uuid, ttl_secs: i64, secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub,
            email: "user@example.com".into(),
            exp: now + ttl_secs,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_round_trip() {
        let config = config_with_secret("test-secret");
        let user_id = Uuid::new_v4();
        let token = token_for(user_id, 900, "test-secret");
        let data = verify_token(&token, &config).unwrap();
        assert_eq!(data.claims.sub, user_id);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let config = config_with_secret("right-secret");
        let token = token_for(Uuid::new_v4(), 900, "wrong-secret");
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = config_with_secret("test-secret");
        let token = token_for(Uuid::new_v4(), -3600, "test-secret");
        assert!(verify_token(&token, &config).is_err());
    }
}
