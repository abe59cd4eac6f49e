#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod moderation;
pub mod scheduled_task;
pub mod store;
pub mod verification;

pub use config::Config;

use crate::{
    config::{ConfigFairing, StoreFairing},
    logging::LoggerFairing,
    moderation::ModerationFilter,
};

/// Build the server from the figment found in `Rocket.toml` and `ROCKET_*`
/// environment variables.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
}

/// Attach all fairings, routes, catchers and stateless managed state.
/// Fairing order matters: the store fairing reads the managed [`Config`].
fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(LoggerFairing)
        .manage(ModerationFilter::default())
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server backed by a fresh in-memory store, with test secrets and a
/// bootstrap admin matching [`model::api::admin::AdminCredentials::example`].
#[cfg(test)]
pub(crate) fn rocket_for_tests() -> Rocket<Build> {
    use rocket::data::{Limits, ToByteUnit};

    let limits = Limits::default()
        .limit("data-form", 8.mebibytes())
        .limit("file", 8.mebibytes());
    let upload_dir = std::env::temp_dir().join("voting-backend-test-uploads");
    let figment = rocket::Config::figment()
        .merge(("store", "memory"))
        .merge(("jwt_secret", "test jwt secret"))
        .merge(("auth_ttl", 3600))
        .merge(("upload_dir", upload_dir.to_string_lossy().into_owned()))
        .merge(("verification_delay", 3600))
        .merge(("verification_retries", 2))
        .merge(("expose_errors", true))
        .merge(("admin_username", "coordinator"))
        .merge(("admin_password", "correct horse battery"))
        .merge(("limits", limits));
    assemble(rocket::custom(figment))
}
