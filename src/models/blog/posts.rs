use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::{
    database::schema::{
        posts::dsl::{self as post_dsl},
        users::dsl::{self as user_dsl},
    },
    meltdown::*,
    structs::*,
};

type EntryColumns = (
    post_dsl::id,
    post_dsl::title,
    post_dsl::body,
    post_dsl::created,
    post_dsl::author_id,
    user_dsl::username,
);

const ENTRY_COLUMNS: EntryColumns = (
    post_dsl::id,
    post_dsl::title,
    post_dsl::body,
    post_dsl::created,
    post_dsl::author_id,
    user_dsl::username,
);

impl Post {
    /// Every post with its author's username, newest first.
    pub fn all_with_authors(conn: &mut SqliteConnection) -> Result<Vec<PostEntry>, MeltDown> {
        post_dsl::posts
            .inner_join(user_dsl::users)
            .select(ENTRY_COLUMNS)
            .order((post_dsl::created.desc(), post_dsl::id.desc()))
            .load::<PostEntry>(conn)
            .map_err(|e| MeltDown::from(e).with_context("operation", "all_with_authors"))
    }

    pub fn find_with_author(conn: &mut SqliteConnection, id: i32) -> Result<Option<PostEntry>, MeltDown> {
        post_dsl::posts
            .inner_join(user_dsl::users)
            .filter(post_dsl::id.eq(id))
            .select(ENTRY_COLUMNS)
            .first::<PostEntry>(conn)
            .optional()
            .map_err(|e| MeltDown::from(e).with_context("operation", "find_with_author").with_context("id", id.to_string()))
    }

    pub fn insert(conn: &mut SqliteConnection, new_post: &NewPost<'_>) -> Result<Post, MeltDown> {
        diesel::insert_into(post_dsl::posts)
            .values(new_post)
            .returning(Post::as_returning())
            .get_result(conn)
            .map_err(|e| MeltDown::from(e).with_context("operation", "insert").with_context("author_id", new_post.author_id.to_string()))
    }

    pub fn update_content(conn: &mut SqliteConnection, id: i32, changes: &PostChanges<'_>) -> Result<Post, MeltDown> {
        diesel::update(post_dsl::posts.filter(post_dsl::id.eq(id)))
            .set(changes)
            .returning(Post::as_returning())
            .get_result(conn)
            .map_err(|e| MeltDown::from(e).with_context("operation", "update_content").with_context("id", id.to_string()))
    }

    pub fn delete_by_id(conn: &mut SqliteConnection, id: i32) -> Result<usize, MeltDown> {
        diesel::delete(post_dsl::posts.filter(post_dsl::id.eq(id)))
            .execute(conn)
            .map_err(|e| MeltDown::from(e).with_context("operation", "delete_by_id").with_context("id", id.to_string()))
    }
}
