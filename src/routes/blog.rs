use rocket::form::Form;
use rocket::response::{Flash, Redirect};
use rocket::{get, post, routes, uri, Either, Route};
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::{database::db::DbConn, meltdown::*, middleware::*, quill_log, services::catalog, structs::*};

#[get("/")]
pub async fn get_index(app_context: AppContext<'_>, mut db: DbConn) -> Result<Template, MeltDown> {
    let posts = catalog::list(&mut db)?;
    Ok(app_context.render_with("blog/index", json!({ "posts": posts })))
}

#[get("/create")]
pub async fn get_create(_user: CurrentUser, app_context: AppContext<'_>) -> Template {
    app_context.render_with("blog/create", json!({ "form": PostForm::default() }))
}

#[post("/create", data = "<post_form>")]
pub async fn post_create(
    user: CurrentUser,
    mut db: DbConn,
    app_context: AppContext<'_>,
    post_form: Form<PostForm>,
) -> Result<Either<Template, Flash<Redirect>>, MeltDown> {
    let form = post_form.into_inner();

    match catalog::create(&mut db, &user, &form) {
        Ok(_) => Ok(Either::Right(Flash::success(Redirect::to(uri!(get_index)), "Post created."))),
        Err(error) if error.is(MeltType::ValidationFailed) => {
            quill_log!(Info, error.log_message());
            Ok(Either::Left(app_context.render_with_error("blog/create", json!({ "form": form }), error.user_message())))
        }
        Err(error) => Err(error),
    }
}

#[get("/<id>/update")]
pub async fn get_update(id: i32, user: CurrentUser, mut db: DbConn, app_context: AppContext<'_>) -> Result<Template, MeltDown> {
    let post = catalog::fetch_owned(&mut db, id, &user)?;
    let form = PostForm::from(&post);
    Ok(app_context.render_with("blog/update", json!({ "post": post, "form": form })))
}

#[post("/<id>/update", data = "<post_form>")]
pub async fn post_update(
    id: i32,
    user: CurrentUser,
    mut db: DbConn,
    app_context: AppContext<'_>,
    post_form: Form<PostForm>,
) -> Result<Either<Template, Flash<Redirect>>, MeltDown> {
    let form = post_form.into_inner();

    match catalog::update(&mut db, &user, id, &form) {
        Ok(_) => Ok(Either::Right(Flash::success(Redirect::to(uri!(get_index)), "Post updated."))),
        Err(error) if error.is(MeltType::ValidationFailed) => {
            quill_log!(Info, error.log_message());
            // The rejected values are shown back, the stored post supplies the rest.
            let post = catalog::fetch_owned(&mut db, id, &user)?;
            Ok(Either::Left(app_context.render_with_error(
                "blog/update",
                json!({ "post": post, "form": form }),
                error.user_message(),
            )))
        }
        Err(error) => Err(error),
    }
}

#[post("/<id>/delete")]
pub async fn post_delete(id: i32, user: CurrentUser, mut db: DbConn) -> Result<Flash<Redirect>, MeltDown> {
    catalog::delete(&mut db, &user, id)?;
    Ok(Flash::success(Redirect::to(uri!(get_index)), "Post deleted."))
}

pub fn routes() -> Vec<Route> {
    routes![get_index, get_create, post_create, get_update, post_update, post_delete]
}
