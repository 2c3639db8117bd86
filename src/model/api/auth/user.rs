use std::fmt::{Display, Formatter};

use serde::de::DeserializeOwned;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{admin::Admin, voter::Voter},
    mongodb::{Id, MongoCollection},
};

/// An account that can sign in and receive an auth token.
pub trait User: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// The rights granted to every account of this kind.
    const RIGHTS: Rights;

    fn id(&self) -> Id;

    /// The name the account signs in with.
    fn login_name(&self) -> &str;

    fn accepts_password(&self, password: &str) -> bool;
}

/// Privilege level carried inside a token. Stored as a single byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
        })
    }
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn id(&self) -> Id {
        self.id
    }

    fn login_name(&self) -> &str {
        &self.school_id
    }

    fn accepts_password(&self, password: &str) -> bool {
        self.voter.verify_password(password)
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }

    fn login_name(&self) -> &str {
        &self.username
    }

    fn accepts_password(&self, password: &str) -> bool {
        self.admin.verify_password(password)
    }
}
