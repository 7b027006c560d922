use bcrypt::{hash, verify};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::{
    database::schema::users::dsl::{self as user_dsl},
    meltdown::*,
    structs::*,
};

impl Users {
    pub fn verify_password(&self, password: &str) -> bool {
        verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn register_user(conn: &mut SqliteConnection, register: &RegisterForm, cost: u32) -> Result<Users, MeltDown> {
        let username = register.username.trim();

        if username.is_empty() {
            return Err(MeltDown::validation_failed("username").with_user_message("Username is required."));
        }
        if register.password.is_empty() {
            return Err(MeltDown::validation_failed("password").with_user_message("Password is required."));
        }

        let new_user = NewUser {
            username: username.to_string(),
            password_hash: hash(&register.password, cost)?,
        };

        diesel::insert_into(user_dsl::users)
            .values(&new_user)
            .returning(Users::as_returning())
            .get_result(conn)
            .map_err(|e| {
                let error = MeltDown::from(e).with_context("operation", "register_user");
                if error.is(MeltType::UniqueViolation) {
                    error.with_user_message(format!("User {} is already registered.", username))
                } else {
                    error
                }
            })
    }

    pub fn get_user_by_id(conn: &mut SqliteConnection, id: i32) -> Result<Users, MeltDown> {
        user_dsl::users
            .filter(user_dsl::id.eq(id))
            .select(Users::as_select())
            .first(conn)
            .map_err(|e| MeltDown::from(e).with_context("operation", "get_user_by_id").with_context("id", id.to_string()))
    }

    pub fn find_by_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<Users>, MeltDown> {
        user_dsl::users
            .filter(user_dsl::username.eq(username))
            .select(Users::as_select())
            .first(conn)
            .optional()
            .map_err(|e| MeltDown::from(e).with_context("operation", "find_by_username"))
    }

    /// Resolves a login attempt. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    pub fn authenticate(conn: &mut SqliteConnection, login: &LoginForm) -> Result<Users, MeltDown> {
        let user = Self::find_by_username(conn, login.username.trim())?.ok_or_else(MeltDown::invalid_credentials)?;

        if user.verify_password(&login.password) {
            Ok(user)
        } else {
            Err(MeltDown::invalid_credentials().with_context("username", user.username))
        }
    }
}
