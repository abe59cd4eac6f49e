use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::db::admin::NewAdmin;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())
}

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = ();

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        // Check credentials are acceptable.
        if cred.username.trim().is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(());
        }

        let password_hash = hash_password(&cred.password).map_err(|_| ())?;
        Ok(Self {
            username: cred.username,
            password_hash,
        })
    }
}

/// Response to a successful admin sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogin {
    /// Bearer token; also set as the `auth_token` cookie.
    pub token: String,
    pub username: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_rejected() {
        let credentials = AdminCredentials {
            username: "someone".into(),
            password: "short".into(),
        };
        assert!(NewAdmin::try_from(credentials).is_err());
        assert!(NewAdmin::try_from(AdminCredentials::empty()).is_err());
    }

    #[test]
    fn password_is_hashed() {
        let admin = NewAdmin::try_from(AdminCredentials::example()).unwrap();
        assert_eq!(admin.username, "coordinator");
        assert_ne!(admin.password_hash, AdminCredentials::example().password);
    }
}
