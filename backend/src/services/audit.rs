//! Append-only audit log writes
//!
//! Every status mutation records who changed what; entries are written in
//! the same transaction as the mutation and never read back by the core.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;
use shared::AuditAction;

/// Record one audit entry
pub async fn record<'e>(
    db: impl PgExecutor<'e>,
    user_id: Option<Uuid>,
    action: AuditAction,
    entity_type: &str,
    entity_id: &str,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, entity_type, entity_id, old_values, new_values)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(old_values)
    .bind(new_values)
    .execute(db)
    .await?;

    Ok(())
}
