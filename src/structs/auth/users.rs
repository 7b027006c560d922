use diesel::prelude::*;
use rocket::FromForm;
use serde::Serialize;

use crate::database::schema::users;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Users {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// The authenticated identity handed to every handler that needs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
}

impl From<&Users> for CurrentUser {
    fn from(user: &Users) -> Self {
        CurrentUser {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(FromForm, Debug, Clone)]
pub struct LoginForm {
    #[field(default = String::new())]
    pub username: String,
    #[field(default = String::new())]
    pub password: String,
}

#[derive(FromForm, Debug, Clone, Serialize)]
pub struct RegisterForm {
    #[field(default = String::new())]
    pub username: String,
    #[field(default = String::new())]
    #[serde(skip_serializing)]
    pub password: String,
}
