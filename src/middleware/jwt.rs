use rocket::{
    async_trait,
    http::{Cookie, Status},
    request::{self, FromRequest, Outcome, Request},
};
use serde::{Deserialize, Serialize};

use crate::{bootstrap::AppConfig, meltdown::*, quill_log, services::jwt_service};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    /// `sub` is checked to be numeric when the token is validated.
    pub fn user_id(&self) -> i32 {
        self.sub.parse::<i32>().unwrap_or_default()
    }
}

pub struct JWT(pub Claims);

impl JWT {
    pub fn user_id(&self) -> i32 {
        self.0.user_id()
    }

    pub fn get_username(&self) -> &str {
        &self.0.username
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for JWT {
    type Error = MeltDown;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let cookies = request.cookies();
        let token = match cookies.get(jwt_service::TOKEN_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                let error = MeltDown::missing_token();
                return Outcome::Error((error.status_code(), error));
            }
        };

        let config = match request.rocket().state::<AppConfig>() {
            Some(config) => config,
            None => {
                let error = MeltDown::new(MeltType::ConfigurationError, "AppConfig is not managed");
                quill_log!(Error, error.log_message());
                return Outcome::Error((Status::InternalServerError, error));
            }
        };

        match jwt_service::validate_token(&token, &config.settings.auth) {
            Ok(claims) => Outcome::Success(JWT(claims)),
            Err(error) => {
                quill_log!(Warning, error.log_message());
                cookies.remove(Cookie::from(jwt_service::TOKEN_COOKIE));
                Outcome::Error((error.status_code(), error))
            }
        }
    }
}
