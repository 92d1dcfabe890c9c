//! Entry number allocation backed by the `entry_sequences` table.
//!
//! One upsert both creates the `(tenant, year)` row and increments it. The
//! row lock taken by the upsert serializes concurrent allocations for the
//! same key until the surrounding transaction ends, so a rolled back entry
//! gives its number back.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Statement};
use tally_core::ledger::{EntryNumber, EntrySequence, LedgerError};
use tally_shared::types::TenantId;

use crate::entities::entry_sequences;
use crate::error::ledger_error;

const NEXT_VALUE_SQL: &str = r"
INSERT INTO entry_sequences (tenant_id, year, last_value)
VALUES ($1, $2, 1)
ON CONFLICT (tenant_id, year)
DO UPDATE SET last_value = entry_sequences.last_value + 1
RETURNING last_value
";

/// Sequence repository.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
}

impl SequenceRepository {
    /// Creates a new sequence repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Allocates the next number for `(tenant_id, year)` on `conn`.
    ///
    /// Pass the entry-creation transaction so the number is only consumed
    /// if the entry commits.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the upsert fails or yields no row.
    pub async fn allocate<C: ConnectionTrait>(
        conn: &C,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<EntryNumber, LedgerError> {
        let row = conn
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                NEXT_VALUE_SQL,
                [tenant_id.into_inner().into(), year.into()],
            ))
            .await
            .map_err(ledger_error)?
            .ok_or_else(|| LedgerError::Storage("entry sequence upsert returned no row".into()))?;

        let last_value: i32 = row
            .try_get("", "last_value")
            .map_err(ledger_error)?;
        let counter = u32::try_from(last_value)
            .map_err(|_| LedgerError::Storage(format!("invalid sequence value {last_value}")))?;

        Ok(EntryNumber::new(year, counter))
    }

    /// Last value handed out for the key, 0 if none.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the query fails.
    pub async fn last_value(&self, tenant_id: TenantId, year: i32) -> Result<u32, LedgerError> {
        let row = entry_sequences::Entity::find_by_id((tenant_id.into_inner(), year))
            .one(&self.db)
            .await
            .map_err(ledger_error)?;

        Ok(row.map_or(0, |r| u32::try_from(r.last_value).unwrap_or(0)))
    }
}

/// Allocates outside any entry transaction, so each number commits on its own.
#[async_trait]
impl EntrySequence for SequenceRepository {
    async fn next_entry_number(
        &self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<EntryNumber, LedgerError> {
        Self::allocate(&self.db, tenant_id, year).await
    }
}
