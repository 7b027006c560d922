#[macro_use]
extern crate rocket;

use rocket::fairing::AdHoc;
use rocket::fs::{relative, FileServer};
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

mod bootstrap;
mod database;
mod meltdown;
mod middleware;
mod models;
mod routes;
mod services;
mod structs;

#[cfg(test)]
mod test_support;

use bootstrap::*;
use database::db::DbPool;
use middleware::*;

#[launch]
fn rocket() -> _ {
    let (config, pool) = bootstrap();
    quill_log!(Info, "Starting server...");
    build_rocket(config, pool)
}

/// Assembles the application around an already-migrated pool.
pub fn build_rocket(config: AppConfig, pool: DbPool) -> Rocket<Build> {
    if config.is_development() {
        quill_log!(Debug, format!("Database at {}", config.settings.database.url));
    }

    rocket::build()
        .manage(config)
        .manage(pool)
        .mount("/", routes::blog::routes())
        .mount("/auth", routes::auth::routes())
        .mount("/public", FileServer::from(relative!("public")))
        .register("/", catchers![unauthorized, forbidden, not_found, unprocessable_entity, internal_error, service_unavailable])
        .attach(Template::fairing())
        .attach(AdHoc::on_response("Error Logger", |req, res| {
            Box::pin(async move {
                if res.status().code >= 400 {
                    quill_log!(Warning, format!("{} {} -> {}", req.method(), req.uri(), res.status()));
                }
            })
        }))
}
