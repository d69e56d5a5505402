//! Append-only audit log.
//!
//! Records open/close/query/failure/key events with the writing pid.
//! Rows are never updated or deleted by the engine.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;

use crate::to_storage_err;

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Open,
    Close,
    Query,
    Failed,
    KeyAccess,
    KeyRotate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Open => "open",
            AuditAction::Close => "close",
            AuditAction::Query => "query",
            AuditAction::Failed => "failed",
            AuditAction::KeyAccess => "key-access",
            AuditAction::KeyRotate => "key-rotate",
        }
    }
}

/// Writes audit rows. A disabled logger swallows every call.
#[derive(Debug, Clone, Copy)]
pub struct AuditLogger {
    enabled: bool,
}

impl AuditLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Append one audit row. Audit failures are logged and swallowed:
    /// they must not fail the audited operation.
    pub fn log(&self, conn: &Connection, action: AuditAction, details: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.log_inner(conn, action, details) {
            tracing::warn!(error = %e, action = action.as_str(), "audit write failed");
        }
    }

    fn log_inner(
        &self,
        conn: &Connection,
        action: AuditAction,
        details: &str,
    ) -> EngramResult<()> {
        conn.execute(
            "INSERT INTO audit_log (action, details, pid) VALUES (?1, ?2, ?3)",
            params![action.as_str(), details, std::process::id()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        Ok(())
    }
}
