use std::ops::{Deref, DerefMut};

use mongodb::{bson::doc, error::Error as DbError};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::password::{hash_password, verify_password},
    mongodb::{Coll, Id},
};

/// Username of the admin account created on first launch.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
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

/// Create the default admin if there are no admins at all.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(
    admins: &Coll<NewAdmin>,
    default_password: &str,
) -> Result<(), DbError> {
    let count = admins.count_documents(None, None).await?;
    if count > 0 {
        return Ok(());
    }

    let password_hash = match hash_password(default_password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Could not hash the default admin password: {e}");
            return Ok(());
        }
    };
    let admin = NewAdmin {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password_hash,
    };
    admins.insert_one(&admin, None).await?;
    warn!("No admins found; created default admin '{DEFAULT_ADMIN_USERNAME}'");
    Ok(())
}
