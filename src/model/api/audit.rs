use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::audit_log::{AuditAction, AuditLog};

use super::ApiId;

/// An audit log entry as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogDescription {
    pub id: ApiId,
    pub actor: String,
    pub action: AuditAction,
    pub target: Option<ApiId>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogDescription {
    fn from(log: AuditLog) -> Self {
        Self {
            id: log.id.into(),
            actor: log.entry.actor,
            action: log.entry.action,
            target: log.entry.target.map(Into::into),
            details: log.entry.details,
            created_at: log.entry.created_at,
        }
    }
}
