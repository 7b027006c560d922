use rocket::catch;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::Redirect;
use rocket::uri;
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::routes::auth;

/// The `error` page, rendered without the per-request context so it works
/// even when the database or session lookup is what failed.
pub fn render_error(status: Status, message: &str) -> Template {
    Template::render(
        "error",
        json!({
            "status": status.code,
            "reason": status.reason().unwrap_or("Error"),
            "message": message,
            "current_user": null,
            "flash": null,
        }),
    )
}

#[catch(401)]
pub fn unauthorized() -> Redirect {
    Redirect::to(uri!("/auth", auth::get_login))
}

#[catch(403)]
pub fn forbidden() -> Template {
    render_error(Status::Forbidden, "You don't have permission to perform this action.")
}

#[catch(404)]
pub fn not_found(req: &Request) -> Template {
    render_error(Status::NotFound, &format!("Nothing lives at {}.", req.uri().path()))
}

#[catch(422)]
pub fn unprocessable_entity() -> Template {
    render_error(Status::UnprocessableEntity, "The submitted form could not be understood.")
}

#[catch(500)]
pub fn internal_error() -> Template {
    render_error(Status::InternalServerError, "An unexpected error occurred.")
}

#[catch(503)]
pub fn service_unavailable() -> Template {
    render_error(Status::ServiceUnavailable, "Unable to connect to database. Please try again later.")
}
