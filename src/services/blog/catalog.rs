//! The post catalog: listing, authorization-gated lookup and the three
//! author-only mutations.
//!
//! Every function takes the request's connection and, where identity matters,
//! the caller as an explicit [`CurrentUser`]. Writes run as a single statement
//! inside a transaction; concurrent updates to one post are last-write-wins.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::{meltdown::*, quill_log, structs::*};

pub fn list(conn: &mut SqliteConnection) -> Result<Vec<PostEntry>, MeltDown> {
    Post::all_with_authors(conn)
}

/// Looks up a post and optionally checks that `viewer` wrote it.
///
/// Missing posts fail with `NotFound` before any ownership check, so the
/// result does not depend on who is asking. With `require_ownership` set, an
/// anonymous viewer fails with `MissingToken` and anyone but the author with
/// `Forbidden`.
pub fn fetch(conn: &mut SqliteConnection, id: i32, viewer: Option<&CurrentUser>, require_ownership: bool) -> Result<PostEntry, MeltDown> {
    let post = Post::find_with_author(conn, id)?
        .ok_or_else(|| MeltDown::not_found(format!("Post {}", id)).with_user_message(format!("Post id {} doesn't exist.", id)))?;

    if !require_ownership {
        return Ok(post);
    }

    let viewer = viewer.ok_or_else(|| MeltDown::missing_token().with_context("post_id", id.to_string()))?;

    if post.author_id != viewer.id {
        return Err(MeltDown::forbidden("Post belongs to another user")
            .with_context("post_id", id.to_string())
            .with_context("viewer_id", viewer.id.to_string()));
    }

    Ok(post)
}

/// [`fetch`] with ownership required, which is what every mutation needs.
pub fn fetch_owned(conn: &mut SqliteConnection, id: i32, user: &CurrentUser) -> Result<PostEntry, MeltDown> {
    fetch(conn, id, Some(user), true)
}

pub fn validate(form: &PostForm) -> Result<(), MeltDown> {
    if form.title.trim().is_empty() {
        return Err(MeltDown::validation_failed("title").with_user_message("Title is required."));
    }
    Ok(())
}

pub fn create(conn: &mut SqliteConnection, author: &CurrentUser, form: &PostForm) -> Result<Post, MeltDown> {
    validate(form)?;

    let new_post = NewPost {
        author_id: author.id,
        title: &form.title,
        body: &form.body,
    };

    let post = conn.transaction::<_, MeltDown, _>(|conn| Post::insert(conn, &new_post))?;
    quill_log!(Info, format!("User {} created post {}", author.id, post.id));
    Ok(post)
}

pub fn update(conn: &mut SqliteConnection, author: &CurrentUser, id: i32, form: &PostForm) -> Result<Post, MeltDown> {
    fetch_owned(conn, id, author)?;
    validate(form)?;

    let changes = PostChanges::from(form);
    let post = conn.transaction::<_, MeltDown, _>(|conn| Post::update_content(conn, id, &changes))?;
    quill_log!(Info, format!("User {} updated post {}", author.id, id));
    Ok(post)
}

pub fn delete(conn: &mut SqliteConnection, author: &CurrentUser, id: i32) -> Result<(), MeltDown> {
    fetch_owned(conn, id, author)?;

    conn.transaction::<_, MeltDown, _>(|conn| Post::delete_by_id(conn, id))?;
    quill_log!(Info, format!("User {} deleted post {}", author.id, id));
    Ok(())
}
