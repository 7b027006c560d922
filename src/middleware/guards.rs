use rocket::{
    async_trait,
    http::Status,
    outcome::Outcome::{Error, Forward, Success},
    request::{FromRequest, Outcome, Request},
};

use crate::{database::db::DbConn, meltdown::*, middleware::*, quill_log, structs::*};

/// Resolves the session cookie to a live user row. The result is cached on
/// the request so the handler and [`AppContext`] share one lookup.
///
/// A missing or invalid token and a deleted account mean "anonymous". Any
/// other failure is the database's and is passed on as an error.
///
/// The connection is returned to the pool before this resolves, so handlers
/// must ask for the user (or [`AppContext`]) before their own `DbConn`.
async fn resolve_current_user(req: &Request<'_>) -> Result<Option<CurrentUser>, MeltDown> {
    let jwt = match req.guard::<JWT>().await {
        Success(jwt) => jwt,
        Error(_) | Forward(_) => return Ok(None),
    };

    let mut conn = match req.guard::<DbConn>().await {
        Success(conn) => conn,
        Error((_, error)) => return Err(error.with_context("user_id", jwt.user_id().to_string())),
        Forward(_) => return Ok(None),
    };

    match Users::get_user_by_id(&mut conn, jwt.user_id()) {
        Ok(user) => Ok(Some(CurrentUser::from(&user))),
        Err(error) if error.is(MeltType::RecordNotFound) => {
            quill_log!(Warning, format!("Session for user {} no longer resolves: {}", jwt.get_username(), error.log_message()));
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// `login_required`: fails with 401 when there is no valid session, which the
/// 401 catcher turns into a redirect to the login page. Database failures keep
/// their own status.
#[async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = MeltDown;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cached = req.local_cache_async(async { resolve_current_user(req).await }).await;

        match cached {
            Ok(Some(user)) => Success(user.clone()),
            Ok(None) => Error((Status::Unauthorized, MeltDown::missing_token().with_context("path", req.uri().path().to_string()))),
            Err(error) => {
                error.log();
                Error((error.status_code(), error.clone()))
            }
        }
    }
}
