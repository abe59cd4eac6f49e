use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{api::admin::AdminCredentials, mongodb::Id},
    store::Storage,
    Config,
};

/// Core admin user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Create the configured bootstrap admin if there are no admins at all.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(storage: &Storage, config: &Config) -> Result<()> {
    if storage.admin_count().await? > 0 {
        return Ok(());
    }
    let Some((username, password)) = config.bootstrap_admin() else {
        warn!("No admins exist and none is configured; admin routes are unusable");
        return Ok(());
    };
    let credentials = AdminCredentials {
        username: username.to_string(),
        password: password.to_string(),
    };
    let admin: NewAdmin = credentials.try_into().map_err(|_| {
        crate::error::Error::validation("Configured admin credentials are not acceptable")
    })?;
    storage.insert_admin(admin).await?;
    info!("Created bootstrap admin '{username}'");
    Ok(())
}
