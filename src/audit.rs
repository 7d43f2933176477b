use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// One row of `audit_logs`. `actor` is `None` for system actions such as seeding.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

impl<'a> AuditEntry<'a> {
    pub fn by(actor: Uuid, action: &'a str, resource: &'a str, metadata: Value) -> Self {
        Self {
            actor: Some(actor),
            action,
            resource,
            metadata,
        }
    }

    pub fn system(action: &'a str, resource: &'a str, metadata: Value) -> Self {
        Self {
            actor: None,
            action,
            resource,
            metadata,
        }
    }
}

/// Insert the entry and return its id.
pub async fn insert(pool: &DbPool, entry: &AuditEntry<'_>) -> AppResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, resource, metadata) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(entry.actor)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Runs after the mutation has committed, so a failed insert is only logged.
pub async fn record(pool: &DbPool, user_id: Uuid, action: &str, resource: &str, metadata: Value) {
    let entry = AuditEntry::by(user_id, action, resource, metadata);
    if let Err(err) = insert(pool, &entry).await {
        tracing::warn!(error = %err, action, resource, "audit log failed");
    }
}
