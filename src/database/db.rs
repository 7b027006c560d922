use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use diesel::{
    connection::SimpleConnection,
    r2d2::{self, ConnectionManager, CustomizeConnection, Pool},
    sqlite::SqliteConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::{
    async_trait,
    http::Status,
    outcome::Outcome::{Error, Forward, Success},
    request::{FromRequest, Outcome, Request},
    State,
};

use crate::{bootstrap::DatabaseSettings, meltdown::*, quill_log};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbPooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas. SQLite keeps these per handle, so they are applied
/// every time the pool opens a connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub enable_foreign_keys: bool,
    pub busy_timeout: Option<Duration>,
}

impl ConnectionOptions {
    pub fn apply(&self, conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
        if self.enable_foreign_keys {
            conn.batch_execute("PRAGMA foreign_keys = ON;")?;
        }
        if let Some(timeout) = self.busy_timeout {
            conn.batch_execute(&format!("PRAGMA busy_timeout = {};", timeout.as_millis()))?;
        }
        Ok(())
    }
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        self.apply(conn).map_err(r2d2::Error::QueryError)
    }
}

pub fn init_connection_pool(settings: &DatabaseSettings) -> Result<DbPool, MeltDown> {
    if let Some(parent) = std::path::Path::new(&settings.url).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| MeltDown::from(e).with_context("database_url", settings.url.as_str()))?;
        }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(settings.url.as_str());
    let options = ConnectionOptions {
        enable_foreign_keys: true,
        busy_timeout: Some(Duration::from_millis(settings.busy_timeout_ms)),
    };

    Pool::builder()
        .max_size(settings.max_pool_size)
        .connection_customizer(Box::new(options))
        .build(manager)
        .map_err(|e| MeltDown::db_connection(format!("Failed to create pool for {}: {}", settings.url, e)))
}

pub fn run_migrations(pool: &DbPool) -> Result<(), MeltDown> {
    let mut conn = pool.get()?;
    run_pending_migrations(&mut conn)
}

pub fn run_pending_migrations(conn: &mut SqliteConnection) -> Result<(), MeltDown> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| MeltDown::new(MeltType::DatabaseError, format!("Migration failed: {}", e)))?;

    for version in &applied {
        quill_log!(Info, format!("Applied migration {}", version));
    }

    Ok(())
}

/// A pooled connection checked out for the lifetime of one request.
pub struct DbConn(DbPooledConnection);

impl Deref for DbConn {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for DbConn {
    type Error = MeltDown;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let pool = match req.guard::<&State<DbPool>>().await {
            Success(pool) => pool,
            Error((status, _)) => {
                return Error((status, MeltDown::db_connection("Database pool is not managed")));
            }
            Forward(status) => return Forward(status),
        };

        match pool.get() {
            Ok(conn) => Success(DbConn(conn)),
            Err(e) => {
                let error = MeltDown::from(e);
                Error((Status::ServiceUnavailable, error))
            }
        }
    }
}
