//! Fixtures shared by the unit and HTTP tests.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::{http::Cookie, local::blocking::Client};
use rstest::fixture;
use tempfile::TempDir;

use crate::{
    bootstrap::AppConfig,
    database::schema::posts,
    build_rocket,
    database::db::{self, ConnectionOptions, DbPool},
    services::jwt_service,
    structs::*,
};

pub const TEST_BCRYPT_COST: u32 = 4;
pub const TEST_JWT_SECRET: &str = "quill-test-secret";

/// A fresh in-memory database with the schema applied.
#[fixture]
pub fn conn() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").expect("in-memory sqlite");
    ConnectionOptions {
        enable_foreign_keys: true,
        busy_timeout: None,
    }
    .apply(&mut conn)
    .expect("pragmas");
    db::run_pending_migrations(&mut conn).expect("migrations");
    conn
}

pub fn seed_user(conn: &mut SqliteConnection, username: &str) -> CurrentUser {
    let form = RegisterForm {
        username: username.to_string(),
        password: format!("{}-password", username),
    };
    let user = Users::register_user(conn, &form, TEST_BCRYPT_COST).expect("seed user");
    CurrentUser::from(&user)
}

pub fn count_posts(conn: &mut SqliteConnection) -> i64 {
    posts::table.count().get_result(conn).expect("post count")
}

pub fn test_config(database_url: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.settings.environment = "test".to_string();
    config.settings.auth.bcrypt_cost = TEST_BCRYPT_COST;
    config.settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.settings.database.url = database_url;
    config.settings.database.max_pool_size = 4;
    config
}

/// The production rocket wired to a throwaway SQLite file.
pub struct TestApp {
    pub client: Client,
    pub config: AppConfig,
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_pool_size(4)
    }

    pub fn with_pool_size(max_pool_size: u32) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = dir.path().join("quill-test.sqlite3").to_string_lossy().into_owned();
        let mut config = test_config(url);
        config.settings.database.max_pool_size = max_pool_size;

        let pool = db::init_connection_pool(&config.settings.database).expect("pool");
        db::run_migrations(&pool).expect("migrations");

        let client = Client::untracked(build_rocket(config.clone(), pool.clone())).expect("valid rocket instance");

        TestApp {
            client,
            config,
            pool,
            _dir: dir,
        }
    }

    pub fn conn(&self) -> db::DbPooledConnection {
        self.pool.get().expect("pooled connection")
    }

    pub fn seed_user(&self, username: &str) -> CurrentUser {
        seed_user(&mut self.conn(), username)
    }

    /// A session cookie for `user`, as the login route would set it.
    pub fn session_for(&self, user: &CurrentUser) -> Cookie<'static> {
        let token = jwt_service::issue_token(user, &self.config.settings.auth).expect("token");
        Cookie::new(jwt_service::TOKEN_COOKIE, token)
    }
}

#[fixture]
pub fn app() -> TestApp {
    TestApp::new()
}
