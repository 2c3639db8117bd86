use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::password::{hash_password, MIN_PASSWORD_LENGTH},
    db::admin::NewAdmin,
};

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self> {
        let username = cred.username.trim();
        if username.is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request("Illegal admin credentials".to_string()));
        }

        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(&cred.password)?,
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        /// Credentials matching [`NewAdmin::example`].
        pub fn example() -> Self {
            Self {
                username: "coordinator".into(),
                password: NewAdmin::EXAMPLE_PASSWORD.into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "adviser".into(),
                password: "totallysecurepassword".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_rules() {
        let admin = NewAdmin::try_from(AdminCredentials::example2()).unwrap();
        assert_eq!(admin.username, "adviser");
        assert!(admin.verify_password("totallysecurepassword"));

        assert!(NewAdmin::try_from(AdminCredentials::empty()).is_err());
        let short = AdminCredentials {
            username: "adviser".into(),
            password: "short".into(),
        };
        assert!(NewAdmin::try_from(short).is_err());
        let blank_name = AdminCredentials {
            username: "   ".into(),
            password: "long enough password".into(),
        };
        assert!(NewAdmin::try_from(blank_name).is_err());
    }
}
