use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::{Flash, Redirect};
use rocket::{get, post, routes, uri, Either, Route, State};
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::{
    bootstrap::AppConfig,
    database::db::DbConn,
    meltdown::*,
    middleware::*,
    quill_log,
    routes::blog,
    services::jwt_service::{self, TOKEN_COOKIE},
    structs::*,
};

#[get("/register")]
pub async fn get_register(app_context: AppContext<'_>) -> Template {
    app_context.render("auth/register")
}

#[post("/register", data = "<register_form>")]
pub async fn post_register(
    register_form: Form<RegisterForm>,
    app_context: AppContext<'_>,
    config: &State<AppConfig>,
    mut db: DbConn,
) -> Result<Either<Template, Flash<Redirect>>, MeltDown> {
    let register = register_form.into_inner();

    match Users::register_user(&mut db, &register, config.settings.auth.bcrypt_cost) {
        Ok(user) => {
            quill_log!(Info, format!("Registered user {} ({})", user.username, user.id));
            Ok(Either::Right(Flash::success(Redirect::to(uri!("/auth", get_login)), "Registration complete. Please log in.")))
        }
        Err(error) if error.is(MeltType::ValidationFailed) || error.is(MeltType::UniqueViolation) => {
            error.log();
            Ok(Either::Left(app_context.render_with_error("auth/register", json!({ "form": register }), error.user_message())))
        }
        Err(error) => Err(error),
    }
}

#[get("/login")]
pub async fn get_login(user: Option<CurrentUser>, app_context: AppContext<'_>) -> Either<Template, Redirect> {
    if let Some(user) = user {
        quill_log!(Debug, format!("User {} is already logged in", user.username));
        return Either::Right(Redirect::to(uri!(blog::get_index)));
    }

    Either::Left(app_context.render("auth/login"))
}

#[post("/login", data = "<login_form>")]
pub async fn post_login(
    login_form: Form<LoginForm>,
    app_context: AppContext<'_>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
    mut db: DbConn,
) -> Result<Either<Template, Flash<Redirect>>, MeltDown> {
    let login = login_form.into_inner();

    let user = match Users::authenticate(&mut db, &login) {
        Ok(user) => CurrentUser::from(&user),
        Err(error) if error.is(MeltType::InvalidCredentials) => {
            error.log();
            return Ok(Either::Left(app_context.render_with_error(
                "auth/login",
                json!({ "form": { "username": login.username } }),
                error.user_message(),
            )));
        }
        Err(error) => return Err(error),
    };

    let token = jwt_service::issue_token(&user, &config.settings.auth)?;
    let cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.is_production());
    cookies.add(cookie);

    quill_log!(Info, format!("User {} logged in", user.username));
    Ok(Either::Right(Flash::success(Redirect::to(uri!(blog::get_index)), format!("Welcome back, {}.", user.username))))
}

#[get("/logout")]
pub fn get_logout(cookies: &CookieJar<'_>) -> Flash<Redirect> {
    cookies.remove(Cookie::build(TOKEN_COOKIE).path("/"));
    quill_log!(Info, "User logged out");
    Flash::success(Redirect::to(uri!(blog::get_index)), "You have been logged out.")
}

pub fn routes() -> Vec<Route> {
    routes![get_register, post_register, get_login, post_login, get_logout]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use rocket::http::{ContentType, Status};
    use rstest::rstest;

    #[rstest]
    fn register_creates_account_and_redirects_to_login(app: TestApp) {
        let response = app.client.post("/auth/register").header(ContentType::Form).body("username=alice&password=secret").dispatch();

        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/auth/login"));

        let user = Users::find_by_username(&mut app.conn(), "alice").unwrap().expect("registered");
        assert!(user.verify_password("secret"));
    }

    #[rstest]
    #[case::no_username("username=&password=secret", "Username is required.")]
    #[case::no_password("username=alice&password=", "Password is required.")]
    fn register_validation_rerenders_form(app: TestApp, #[case] body: &str, #[case] message: &str) {
        let response = app.client.post("/auth/register").header(ContentType::Form).body(body).dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().unwrap().contains(message));
    }

    #[rstest]
    fn duplicate_username_is_reported(app: TestApp) {
        app.seed_user("alice");

        let response = app.client.post("/auth/register").header(ContentType::Form).body("username=alice&password=other").dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert!(response.into_string().unwrap().contains("User alice is already registered."));
    }

    #[rstest]
    fn login_sets_http_only_session_cookie(app: TestApp) {
        app.seed_user("alice");

        let response = app.client.post("/auth/login").header(ContentType::Form).body("username=alice&password=alice-password").dispatch();

        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/"));

        let cookie = response.cookies().get(TOKEN_COOKIE).expect("session cookie");
        assert_eq!(cookie.http_only(), Some(true));

        let claims = jwt_service::validate_token(cookie.value(), &app.config.settings.auth).unwrap();
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn register_and_login_work_with_a_single_connection_pool() {
        let app = TestApp::with_pool_size(1);

        let registered = app.client.post("/auth/register").header(ContentType::Form).body("username=alice&password=secret").dispatch();
        assert_eq!(registered.status(), Status::SeeOther);

        let failed = app.client.post("/auth/login").header(ContentType::Form).body("username=alice&password=wrong").dispatch();
        assert_eq!(failed.status(), Status::Ok);

        let response = app.client.post("/auth/login").header(ContentType::Form).body("username=alice&password=secret").dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert!(response.cookies().get(TOKEN_COOKIE).is_some());
    }

    #[rstest]
    #[case::wrong_password("username=alice&password=nope")]
    #[case::unknown_user("username=mallory&password=alice-password")]
    fn failed_login_rerenders_without_a_cookie(app: TestApp, #[case] body: &str) {
        app.seed_user("alice");

        let response = app.client.post("/auth/login").header(ContentType::Form).body(body).dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert!(response.cookies().get(TOKEN_COOKIE).is_none());
        assert!(response.into_string().unwrap().contains("Incorrect username or password."));
    }

    #[rstest]
    fn login_page_redirects_when_already_logged_in(app: TestApp) {
        let alice = app.seed_user("alice");

        let response = app.client.get("/auth/login").cookie(app.session_for(&alice)).dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/"));

        let anonymous = app.client.get("/auth/login").dispatch();
        assert_eq!(anonymous.status(), Status::Ok);
    }

    #[rstest]
    fn tampered_session_is_anonymous(app: TestApp) {
        let response = app.client.get("/create").cookie(Cookie::new(TOKEN_COOKIE, "not-a-jwt")).dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/auth/login"));
    }

    #[rstest]
    fn logout_clears_the_session_cookie(app: TestApp) {
        let alice = app.seed_user("alice");

        let response = app.client.get("/auth/logout").cookie(app.session_for(&alice)).dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(response.headers().get_one("Location"), Some("/"));

        let cleared = response.cookies().get(TOKEN_COOKIE).expect("removal cookie");
        assert_eq!(cleared.value(), "");
    }
}
