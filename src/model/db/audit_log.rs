use std::fmt::{Display, Formatter};
use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};

/// Actor recorded for lifecycle changes made by the scheduler rather than an admin.
pub const SYSTEM_ACTOR: &str = "system";

/// Kinds of recorded admin action.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateAdmin,
    DeleteAdmin,
    CreateVoter,
    DeleteVoter,
    CreateElection,
    UpdateElection,
    DeleteElection,
    ChangeStatus,
    CreatePosition,
    DeletePosition,
    CreatePartylist,
    DeletePartylist,
    CreateCandidate,
    DeleteCandidate,
    DeleteVote,
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Same spelling as the stored form.
        let text = format!("{self:?}");
        let mut out = String::with_capacity(text.len() + 4);
        for (i, c) in text.chars().enumerate() {
            if c.is_ascii_uppercase() && i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_uppercase());
        }
        write!(f, "{out}")
    }
}

/// Core audit log data, as stored in the database. Entries are insert-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogCore {
    /// Username of the admin responsible, or [`SYSTEM_ACTOR`].
    pub actor: String,
    pub action: AuditAction,
    /// The document acted upon, if any.
    pub target: Option<Id>,
    pub details: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl AuditLogCore {
    /// Create a new entry timestamped now.
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        target: impl Into<Option<Id>>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            target: target.into(),
            details: details.into(),
            created_at: Utc::now(),
        }
    }

    /// Write this entry to the log.
    pub async fn record(self, audit_logs: &Coll<NewAuditLog>) -> Result<()> {
        info!("audit: {} {} {}", self.actor, self.action, self.details);
        audit_logs.insert_one(&self, None).await?;
        Ok(())
    }
}

/// An audit log entry without an ID.
pub type NewAuditLog = AuditLogCore;

/// An audit log entry from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub entry: AuditLogCore,
}

impl Deref for AuditLog {
    type Target = AuditLogCore;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}
