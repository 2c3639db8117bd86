use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::password::{hash_password, MIN_PASSWORD_LENGTH},
    db::voter::{NewVoter, Voter},
};

use super::ApiId;

/// Voter sign-in credentials.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoterCredentials {
    pub school_id: String,
    pub password: String,
}

/// A voter account to be created by an admin.
#[derive(Clone, Deserialize, Serialize)]
pub struct VoterSpec {
    pub school_id: String,
    pub name: String,
    pub password: String,
}

impl TryFrom<VoterSpec> for NewVoter {
    type Error = Error;

    fn try_from(spec: VoterSpec) -> Result<Self> {
        let school_id = spec.school_id.trim();
        let name = spec.name.trim();
        if school_id.is_empty() || name.is_empty() {
            return Err(Error::bad_request(
                "Voter school ID and name must not be empty".to_string(),
            ));
        }
        if spec.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request(format!(
                "Voter password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        Ok(Self {
            school_id: school_id.to_string(),
            name: name.to_string(),
            password_hash: hash_password(&spec.password)?,
        })
    }
}

/// A voter as listed to admins. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub id: ApiId,
    pub school_id: String,
    pub name: String,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id.into(),
            school_id: voter.voter.school_id,
            name: voter.voter.name,
        }
    }
}
