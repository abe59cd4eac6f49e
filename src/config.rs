use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    engine::VoteEngine,
    model::db::admin::ensure_admin_exists,
    store::{MongoStore, Storage},
    verification::DocumentVerifier,
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    upload_dir: PathBuf,
    verification_delay: u32,
    verification_retries: u32,
    #[serde(default)]
    expose_errors: bool,
    admin_username: Option<String>,
    // secrets
    jwt_secret: String,
    admin_password: Option<String>,
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Directory uploaded identity documents are stored in.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// How long after upload a document is considered verified.
    pub fn verification_delay(&self) -> StdDuration {
        StdDuration::from_secs(self.verification_delay.into())
    }

    /// How many times a failed verification update is retried.
    pub fn verification_retries(&self) -> u32 {
        self.verification_retries
    }

    /// Whether internal error messages are shown to clients.
    /// Should only be enabled in development.
    pub fn expose_errors(&self) -> bool {
        self.expose_errors
    }

    /// Credentials for the admin created when none exists yet.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        Some((self.admin_username.as_deref()?, self.admin_password.as_deref()?))
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the store fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.expose_errors() {
            warn!("Internal error messages will be shown to clients");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which document store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongodb,
    Memory,
}

/// Configuration for the document store.
#[derive(Deserialize)]
struct StoreConfig {
    store: StoreKind,
    // secrets
    db_uri: Option<String>,
}

/// A fairing that loads the store config, connects to the database if needed,
/// performs any setup necessary, and places the [`Storage`] and the services
/// built on it into managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Document store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let storage = match config.store {
            StoreKind::Memory => {
                warn!("Using the in-memory store; nothing will survive a restart");
                Storage::memory()
            }
            StoreKind::Mongodb => {
                let Some(db_uri) = config.db_uri else {
                    error!("`db_uri` must be set when `store` is \"mongodb\"");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&db_uri, &get_database_name()).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Storage::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        // The config fairing runs first, so the config is only missing if it failed.
        let setup = match rocket.state::<Config>() {
            Some(app_config) => match ensure_admin_exists(&storage, app_config).await {
                Ok(()) => Ok(DocumentVerifier::new(storage.clone(), app_config)),
                Err(e) => Err(format!("Failed to bootstrap admin: {e}")),
            },
            None => Err("Application config missing, cannot finish store setup".to_string()),
        };
        let verifier = match setup {
            Ok(verifier) => verifier,
            Err(msg) => {
                error!("{msg}");
                return Err(rocket);
            }
        };
        let engine = VoteEngine::new(storage.clone());

        // Manage the state.
        rocket = rocket.manage(storage).manage(engine).manage(verifier);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "voting".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}
