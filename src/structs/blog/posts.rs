use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::FromForm;
use serde::Serialize;

use crate::database::schema::posts;

#[derive(Debug, Queryable, Selectable, Identifiable, Clone, Serialize, PartialEq)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Post {
    pub id: i32,
    pub author_id: i32,
    pub created: NaiveDateTime,
    pub title: String,
    pub body: String,
}

/// A post joined with its author's username, as shown on every page.
#[derive(Debug, Queryable, Clone, Serialize, PartialEq)]
pub struct PostEntry {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub created: NaiveDateTime,
    pub author_id: i32,
    pub username: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub author_id: i32,
    pub title: &'a str,
    pub body: &'a str,
}

/// The only columns an update may touch.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = posts)]
pub struct PostChanges<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(FromForm, Debug, Clone, Default, Serialize, PartialEq)]
pub struct PostForm {
    #[field(default = String::new())]
    pub title: String,
    #[field(default = String::new())]
    pub body: String,
}

impl PostForm {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        PostForm {
            title: title.into(),
            body: body.into(),
        }
    }
}

impl From<&PostEntry> for PostForm {
    fn from(post: &PostEntry) -> Self {
        PostForm::new(post.title.as_str(), post.body.as_str())
    }
}

impl<'a> From<&'a PostForm> for PostChanges<'a> {
    fn from(form: &'a PostForm) -> Self {
        PostChanges {
            title: &form.title,
            body: &form.body,
        }
    }
}
