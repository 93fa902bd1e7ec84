//! Database-specific error types and conversions.

use fieldops_core::error::FieldOpsError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    /// Schema application failed. Only raised while migrating.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// A runtime statement was rejected.
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the write.
    #[error("Duplicate {entity}")]
    Conflict { entity: String },

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl DbError {
    /// Classify a failed statement, mapping unique index violations and
    /// record id collisions to [`DbError::Conflict`].
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        Self::classify(entity, err.to_string())
    }

    fn classify(entity: &str, text: String) -> Self {
        if text.contains("already contains") || text.contains("already exists") {
            DbError::Conflict {
                entity: entity.into(),
            }
        } else {
            DbError::Query(text)
        }
    }
}

impl From<DbError> for FieldOpsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FieldOpsError::NotFound { entity, id },
            DbError::Conflict { entity } => FieldOpsError::AlreadyExists { entity },
            other => FieldOpsError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_surface_as_already_exists() {
        let err: FieldOpsError = DbError::Conflict {
            entity: "agent phone".into(),
        }
        .into();
        assert!(matches!(err, FieldOpsError::AlreadyExists { ref entity } if entity == "agent phone"));
    }

    #[test]
    fn duplicate_record_ids_are_conflicts() {
        let err = DbError::classify(
            "pending registration code",
            "Database record `pending_code:AG009` already exists".into(),
        );
        assert!(matches!(err, DbError::Conflict { ref entity } if entity == "pending registration code"));
        let err = DbError::classify("tenant code", "Parse error".into());
        assert!(matches!(err, DbError::Query(_)));
    }

    #[test]
    fn failed_statements_are_query_errors() {
        let err = DbError::Query("Found NONE for field `quantity`".into());
        assert_eq!(err.to_string(), "Query failed: Found NONE for field `quantity`");
        assert!(matches!(FieldOpsError::from(err), FieldOpsError::Database(ref m) if m.starts_with("Query failed")));
    }

    #[test]
    fn missing_rows_surface_as_not_found() {
        let err: FieldOpsError = DbError::NotFound {
            entity: "product".into(),
            id: "x".into(),
        }
        .into();
        assert!(matches!(err, FieldOpsError::NotFound { .. }));
    }
}
