use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{AuditAction, AuditEntry};
use crate::services::database::Database;

/// Fire-and-forget audit trail writer.
///
/// Entries go through an unbounded channel to a background task so request
/// handlers never wait on the audit insert. A failed write is logged and
/// dropped; the audit trail is an operational record, not a ledger, and
/// must never fail the operation it describes.
#[derive(Clone)]
pub struct AuditRecorder {
    sender: mpsc::UnboundedSender<AuditEntry>,
}

impl AuditRecorder {
    /// Spawn the writer task and return a recorder handle.
    pub fn spawn(db: Database) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<AuditEntry>();

        tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                if let Err(e) = db.insert_audit_entry(&entry).await {
                    tracing::error!(
                        action = %entry.action_code,
                        "Failed to write audit entry: {}",
                        e
                    );
                }
            }
        });

        Self { sender }
    }

    /// Queue an audit entry. Never blocks, never fails the caller.
    pub fn record(
        &self,
        user_id: Option<Uuid>,
        team_id: Option<Uuid>,
        action: AuditAction,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
        metadata: Option<Value>,
    ) {
        let entry = AuditEntry::new(user_id, team_id, action, entity_type, entity_id, metadata);
        if self.sender.send(entry).is_err() {
            tracing::warn!("Audit writer task is gone, dropping entry");
        }
    }
}
