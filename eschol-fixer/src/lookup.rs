//! Canonical identifier lookups against the eScholarship database.
use crate::correct::CanonicalSource;
use crate::db::DatabaseConnection;
use crate::FixerResult;

/// Matches items whose semi-structured attrs blob carries a local id
/// of type "other" ending in "ucla:<suffix>".
const LOOKUP_SQL: &str = r#"
    SELECT i.id AS eschol_id
    FROM items i,
         jsonb_array_elements(i.attrs -> 'local_ids') AS local_id
    WHERE local_id ->> 'type' = 'other'
      AND local_id ->> 'id' LIKE $1
"#;

/// One read-only connection, reused for every lookup in a batch run.
pub struct EscholDb {
    db: DatabaseConnection,
}

impl EscholDb {
    pub fn new(db: DatabaseConnection) -> EscholDb {
        EscholDb { db }
    }

    pub fn connect(&mut self) -> FixerResult<()> {
        self.db.connect()
    }
}

impl CanonicalSource for EscholDb {
    fn canonical_id(&mut self, suffix: &str) -> FixerResult<Option<String>> {
        let pattern = format!("%ucla:{suffix}");

        let rows = self
            .db
            .client()
            .query(LOOKUP_SQL, &[&pattern])
            .map_err(|e| format!("eschol id lookup failed for ucla:{suffix}: {e}"))?;

        if rows.len() > 1 {
            // The store does not guarantee uniqueness for local ids;
            // surface the ambiguity for auditing.
            log::warn!(
                "{} rows match local id ucla:{suffix}; using the first",
                rows.len()
            );
        }

        match rows.first() {
            Some(row) => {
                let id: String = row
                    .try_get("eschol_id")
                    .map_err(|e| format!("Unexpected eschol_id value for ucla:{suffix}: {e}"))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires a reachable eScholarship database
    fn live_lookup_round_trip() {
        let mut eschol = EscholDb::new(DatabaseConnection::builder().build().unwrap());
        eschol.connect().unwrap();

        // Any suffix is fine; we only care that the query shape is
        // accepted by the server.
        let result = eschol.canonical_id("0000000").unwrap();
        assert!(result.is_none() || result.unwrap().len() > 2);
    }
}
