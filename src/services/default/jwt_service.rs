use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JWTHeader, Validation};

use crate::{bootstrap::AuthSettings, meltdown::*, middleware::jwt::Claims, quill_log, structs::*};

pub const TOKEN_COOKIE: &str = "token";

pub fn generate_token(user: &CurrentUser, settings: &AuthSettings) -> Result<(String, Claims), MeltDown> {
    if settings.jwt_secret.is_empty() {
        return Err(MeltDown::new(MeltType::ConfigurationError, "JWT secret is not configured"));
    }

    let expiry_duration = Duration::hours(settings.token_expiry_hours as i64);

    let now = Utc::now();
    let expiration = now.checked_add_signed(expiry_duration).unwrap_or(now).timestamp() as usize;
    let issued_at = now.timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat: issued_at,
        exp: expiration,
    };

    encode(&JWTHeader::default(), &claims, &EncodingKey::from_secret(settings.jwt_secret.as_bytes()))
        .map(|token| (token, claims))
        .map_err(|e| {
            let error = MeltDown::from(e);
            quill_log!(Error, error.log_message());
            error
        })
}

pub fn issue_token(user: &CurrentUser, settings: &AuthSettings) -> Result<String, MeltDown> {
    generate_token(user, settings).map(|(token, _)| token)
}

pub fn validate_token(token: &str, settings: &AuthSettings) -> Result<Claims, MeltDown> {
    if settings.jwt_secret.is_empty() {
        return Err(MeltDown::new(MeltType::ConfigurationError, "JWT secret is not configured"));
    }

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(settings.jwt_secret.as_bytes()), &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(MeltDown::from)?;

    if claims.sub.parse::<i32>().is_err() {
        return Err(MeltDown::new(MeltType::InvalidToken, "Invalid user ID format in JWT").with_context("sub", claims.sub));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &str) -> AuthSettings {
        AuthSettings {
            jwt_secret: secret.to_string(),
            ..AuthSettings::default()
        }
    }

    fn alice() -> CurrentUser {
        CurrentUser {
            id: 7,
            username: "alice".to_string(),
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let settings = settings("secret");
        let token = issue_token(&alice(), &settings).unwrap();

        let claims = validate_token(&token, &settings).unwrap();
        assert_eq!(claims.user_id(), 7);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&alice(), &settings("one")).unwrap();
        let error = validate_token(&token, &settings("two")).unwrap_err();
        assert_eq!(error.melt_type, MeltType::InvalidToken);
    }

    #[test]
    fn expired_token_is_rejected() {
        let settings = settings("secret");
        let claims = Claims {
            sub: "7".to_string(),
            username: "alice".to_string(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(&JWTHeader::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();

        let error = validate_token(&token, &settings).unwrap_err();
        assert_eq!(error.melt_type, MeltType::ExpiredToken);
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let error = issue_token(&alice(), &settings("")).unwrap_err();
        assert_eq!(error.melt_type, MeltType::ConfigurationError);
    }
}
