use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// One row of the `audit_logs` table.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: &'static str,
    pub resource: &'static str,
    pub metadata: Value,
}

impl AuditEntry {
    pub fn new(user_id: Uuid, action: &'static str, resource: &'static str, metadata: Value) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            resource,
            metadata,
        }
    }
}

pub async fn log_audit(pool: &DbPool, entry: &AuditEntry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Writes an audit entry after the main operation has committed.
///
/// Audit failures never fail the request; they are only logged.
pub async fn record(pool: &DbPool, entry: AuditEntry) {
    if let Err(err) = log_audit(pool, &entry).await {
        tracing::warn!(error = %err, action = entry.action, "audit log failed");
    }
}
