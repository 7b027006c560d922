use std::{collections::HashMap, fmt, io::Error as IoError};

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::{
    http::Status,
    request::Request,
    response::{self, status, Redirect, Responder},
};

use crate::middleware::catchers::render_error;

/// What went wrong, coarse enough to pick a status code and a default
/// message from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeltType {
    DatabaseConnection,
    DatabaseError,
    RecordNotFound,
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,

    InvalidCredentials,
    ExpiredToken,
    InvalidToken,
    MissingToken,

    ValidationFailed,
    Forbidden,
    NotFound,

    FileOperationFailed,
    ConfigurationError,
}

#[derive(Debug, Clone)]
pub struct MeltDown {
    pub melt_type: MeltType,
    pub details: String,
    pub user_message: Option<String>,
    pub context: Option<HashMap<String, String>>,
}

impl MeltDown {
    pub fn new(melt_type: MeltType, details: impl Into<String>) -> Self {
        Self {
            melt_type,
            details: details.into(),
            user_message: None,
            context: None,
        }
    }

    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        self
    }

    pub fn is(&self, melt_type: MeltType) -> bool {
        self.melt_type == melt_type
    }

    /// The text shown to the visitor. Internal details only leak through for
    /// kinds where they name the thing the visitor asked for.
    pub fn user_message(&self) -> String {
        if let Some(msg) = &self.user_message {
            return msg.clone();
        }

        match self.melt_type {
            MeltType::DatabaseConnection => "Unable to connect to database. Please try again later.".to_string(),
            MeltType::DatabaseError | MeltType::ForeignKeyViolation => "A database error occurred. Please try again later.".to_string(),
            MeltType::RecordNotFound | MeltType::NotFound => format!("{} not found.", self.details),
            MeltType::UniqueViolation => format!("{} already exists.", self.details),
            MeltType::CheckViolation => "The submitted data was rejected.".to_string(),

            MeltType::InvalidCredentials => "Incorrect username or password.".to_string(),
            MeltType::ExpiredToken => "Your session has expired. Please log in again.".to_string(),
            MeltType::InvalidToken | MeltType::MissingToken => "Please log in to continue.".to_string(),

            MeltType::ValidationFailed => format!("Invalid {}.", self.details),
            MeltType::Forbidden => "You don't have permission to perform this action.".to_string(),

            MeltType::FileOperationFailed | MeltType::ConfigurationError => "An unexpected error occurred.".to_string(),
        }
    }

    pub fn log_message(&self) -> String {
        let mut message = format!("[{:?}] {}", self.melt_type, self.details);

        if let Some(context) = &self.context {
            let mut pairs: Vec<_> = context.iter().collect();
            pairs.sort();
            for (key, value) in pairs {
                message.push_str(&format!(" | {}={}", key, value));
            }
        }

        message
    }

    pub fn status_code(&self) -> Status {
        match self.melt_type {
            MeltType::InvalidCredentials | MeltType::ExpiredToken | MeltType::InvalidToken | MeltType::MissingToken => Status::Unauthorized,
            MeltType::ValidationFailed | MeltType::CheckViolation => Status::BadRequest,
            MeltType::Forbidden => Status::Forbidden,
            MeltType::NotFound | MeltType::RecordNotFound => Status::NotFound,
            MeltType::UniqueViolation => Status::Conflict,
            MeltType::DatabaseConnection => Status::ServiceUnavailable,
            MeltType::DatabaseError | MeltType::ForeignKeyViolation | MeltType::FileOperationFailed | MeltType::ConfigurationError => {
                Status::InternalServerError
            }
        }
    }

    pub fn log(&self) {
        use crate::quill_log;

        match self.status_code().code {
            400..=499 => quill_log!(Warning, self.log_message()),
            _ => quill_log!(Error, self.log_message()),
        }
    }
}

impl fmt::Display for MeltDown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for MeltDown {}

impl<'r> Responder<'r, 'static> for MeltDown {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        self.log();

        let status = self.status_code();
        if status == Status::Unauthorized {
            return Redirect::to("/auth/login").respond_to(req);
        }

        let page = render_error(status, &self.user_message());

        status::Custom(status, page).respond_to(req)
    }
}

impl From<bcrypt::BcryptError> for MeltDown {
    fn from(err: bcrypt::BcryptError) -> Self {
        MeltDown::new(MeltType::ConfigurationError, format!("Password hashing error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for MeltDown {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => MeltDown::new(MeltType::ExpiredToken, format!("JWT token expired: {}", err)),
            ErrorKind::InvalidToken => MeltDown::new(MeltType::InvalidToken, format!("Invalid JWT token: {}", err)),
            ErrorKind::InvalidSignature => MeltDown::new(MeltType::InvalidToken, format!("Invalid JWT signature: {}", err)),
            ErrorKind::InvalidKeyFormat => MeltDown::new(MeltType::ConfigurationError, format!("Invalid JWT key format: {}", err)),
            _ => MeltDown::new(MeltType::InvalidToken, format!("JWT operation failed: {}", err)),
        }
    }
}

impl From<toml::de::Error> for MeltDown {
    fn from(err: toml::de::Error) -> Self {
        MeltDown::new(MeltType::ConfigurationError, format!("Invalid configuration file: {}", err))
    }
}

impl From<diesel::r2d2::PoolError> for MeltDown {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        MeltDown::db_connection(format!("Pool error: {}", err))
    }
}

impl From<DieselError> for MeltDown {
    fn from(err: DieselError) -> Self {
        match &err {
            DieselError::DatabaseError(kind, info) => {
                let error = match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        let field = if info.message().contains("users.username") { "Username" } else { "This value" };
                        MeltDown::new(MeltType::UniqueViolation, field)
                    }
                    DatabaseErrorKind::ForeignKeyViolation => MeltDown::new(MeltType::ForeignKeyViolation, "Referenced row does not exist"),
                    DatabaseErrorKind::CheckViolation => MeltDown::new(MeltType::CheckViolation, "Check constraint failed"),
                    _ => MeltDown::new(MeltType::DatabaseError, format!("{:?}", kind)),
                };
                error.with_context("db_message", info.message())
            }
            DieselError::NotFound => MeltDown::new(MeltType::RecordNotFound, "Record"),
            _ => MeltDown::new(MeltType::DatabaseError, err.to_string()),
        }
    }
}

impl From<IoError> for MeltDown {
    fn from(err: IoError) -> Self {
        MeltDown::new(MeltType::FileOperationFailed, format!("{:?}: {}", err.kind(), err))
    }
}

impl MeltDown {
    pub fn db_connection(details: impl Into<String>) -> Self {
        Self::new(MeltType::DatabaseConnection, details)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(MeltType::InvalidCredentials, "Invalid username or password")
    }

    pub fn missing_token() -> Self {
        Self::new(MeltType::MissingToken, "Authentication token is missing")
    }

    pub fn validation_failed(details: impl Into<String>) -> Self {
        Self::new(MeltType::ValidationFailed, details)
    }

    pub fn not_found(details: impl Into<String>) -> Self {
        Self::new(MeltType::NotFound, details)
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(MeltType::Forbidden, details)
    }
}
