use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core partylist data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartylistCore {
    pub election_id: Id,
    pub name: String,
}

/// A partylist without an ID.
pub type NewPartylist = PartylistCore;

/// A partylist from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partylist {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub partylist: PartylistCore,
}

impl Deref for Partylist {
    type Target = PartylistCore;

    fn deref(&self) -> &Self::Target {
        &self.partylist
    }
}

impl DerefMut for Partylist {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.partylist
    }
}
