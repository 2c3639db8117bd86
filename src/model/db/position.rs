use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core position data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCore {
    pub election_id: Id,
    pub name: String,
    /// Positions are listed in creation order.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Position {
    /// Filter for every position of an election.
    pub fn of_election(election_id: Id) -> Document {
        doc! { "election_id": election_id }
    }

    /// Stored position order: creation time, then name.
    pub fn ordering() -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "created_at": 1, "name": 1 })
            .build()
    }
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl DerefMut for Position {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.position
    }
}
