//! Entry number generation.
//!
//! Numbers look like `JE-2024-00042`: a per-(tenant, year) counter that
//! starts at 1 every year and never repeats.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use tally_shared::types::TenantId;
use thiserror::Error;

use super::error::LedgerError;

/// Prefix of every generated entry number.
pub const ENTRY_NUMBER_PREFIX: &str = "JE";

/// A generated journal entry number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryNumber {
    /// Numbering year.
    pub year: i32,
    /// Counter within the year, starting at 1.
    pub counter: u32,
}

impl EntryNumber {
    /// Creates an entry number.
    #[must_use]
    pub const fn new(year: i32, counter: u32) -> Self {
        Self { year, counter }
    }
}

impl EntryNumber {
    /// Orders two rendered numbers by year, then counter.
    ///
    /// Counters past `99999` render wider than five digits, so plain string
    /// order would put `JE-2025-100000` before `JE-2025-99999`. Strings that
    /// do not parse sort after those that do.
    #[must_use]
    pub fn cmp_rendered(a: &str, b: &str) -> Ordering {
        match (a.parse::<Self>(), b.parse::<Self>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    }
}

impl fmt::Display for EntryNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ENTRY_NUMBER_PREFIX}-{}-{:05}", self.year, self.counter)
    }
}

/// Error returned when parsing a malformed entry number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed entry number: {0}")]
pub struct ParseEntryNumberError(String);

impl FromStr for EntryNumber {
    type Err = ParseEntryNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseEntryNumberError(s.to_string());
        let mut parts = s.splitn(3, '-');
        if parts.next() != Some(ENTRY_NUMBER_PREFIX) {
            return Err(malformed());
        }
        let year = parts
            .next()
            .and_then(|y| y.parse::<i32>().ok())
            .ok_or_else(malformed)?;
        let counter = parts
            .next()
            .filter(|c| c.len() >= 5)
            .and_then(|c| c.parse::<u32>().ok())
            .filter(|&c| c > 0)
            .ok_or_else(malformed)?;
        Ok(Self { year, counter })
    }
}

/// The numbering year of an entry dated `date`.
#[must_use]
pub fn numbering_year(date: NaiveDate) -> i32 {
    date.year()
}

/// Source of entry numbers.
///
/// Implementations must hand out strictly increasing, never repeated
/// counters per (tenant, year), including under concurrent callers.
#[async_trait]
pub trait EntrySequence: Send + Sync {
    /// Allocates the next number for `(tenant_id, year)`.
    async fn next_entry_number(
        &self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<EntryNumber, LedgerError>;
}

/// Process-local sequence backed by a sharded map.
///
/// The increment runs while the map entry is held, so two callers for the
/// same key are serialized and callers for different keys do not contend.
#[derive(Debug, Default)]
pub struct InMemorySequence {
    counters: DashMap<(TenantId, i32), u32>,
}

impl InMemorySequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next number synchronously.
    ///
    /// # Errors
    ///
    /// `Storage` if the counter for the key is exhausted.
    pub fn allocate(&self, tenant_id: TenantId, year: i32) -> Result<EntryNumber, LedgerError> {
        let mut slot = self.counters.entry((tenant_id, year)).or_insert(0);
        let next = slot
            .checked_add(1)
            .ok_or_else(|| LedgerError::Storage(format!("entry sequence exhausted for {year}")))?;
        *slot = next;
        Ok(EntryNumber::new(year, next))
    }

    #[cfg(test)]
    pub(crate) fn set_last_value(&self, tenant_id: TenantId, year: i32, value: u32) {
        self.counters.insert((tenant_id, year), value);
    }

    /// Last counter handed out for the key, 0 if none.
    #[must_use]
    pub fn last_value(&self, tenant_id: TenantId, year: i32) -> u32 {
        self.counters
            .get(&(tenant_id, year))
            .map_or(0, |slot| *slot)
    }
}

#[async_trait]
impl EntrySequence for InMemorySequence {
    async fn next_entry_number(
        &self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<EntryNumber, LedgerError> {
        self.allocate(tenant_id, year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[rstest]
    #[case(EntryNumber::new(2024, 1), "JE-2024-00001")]
    #[case(EntryNumber::new(2025, 42), "JE-2025-00042")]
    #[case(EntryNumber::new(2025, 123_456), "JE-2025-123456")]
    fn test_format(#[case] number: EntryNumber, #[case] expected: &str) {
        assert_eq!(number.to_string(), expected);
        assert_eq!(expected.parse::<EntryNumber>(), Ok(number));
    }

    #[rstest]
    #[case("JE-2024-1")]
    #[case("XX-2024-00001")]
    #[case("JE-2024-00000")]
    #[case("JE-abcd-00001")]
    #[case("JE-2024")]
    fn test_parse_rejects(#[case] raw: &str) {
        assert!(raw.parse::<EntryNumber>().is_err());
    }

    #[test]
    fn test_rendered_numbers_order_by_counter() {
        use std::cmp::Ordering;

        assert_eq!(
            EntryNumber::cmp_rendered("JE-2025-100000", "JE-2025-99999"),
            Ordering::Greater
        );
        assert_eq!(
            EntryNumber::cmp_rendered("JE-2024-99999", "JE-2025-00001"),
            Ordering::Less
        );
        assert_eq!(EntryNumber::cmp_rendered("legacy", "JE-2025-00001"), Ordering::Greater);
    }

    #[test]
    fn test_year_from_entry_date() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(numbering_year(date), 2023);
    }

    #[tokio::test]
    async fn test_sequential_numbers_have_no_gaps() {
        let seq = InMemorySequence::new();
        let tenant = TenantId::new();
        let first = seq.next_entry_number(tenant, 2024).await.unwrap();
        let second = seq.next_entry_number(tenant, 2024).await.unwrap();
        assert_eq!(first.to_string(), "JE-2024-00001");
        assert_eq!(second.to_string(), "JE-2024-00002");
        assert_eq!(seq.last_value(tenant, 2024), 2);
    }

    #[tokio::test]
    async fn test_counters_scoped_by_tenant_and_year() {
        let seq = InMemorySequence::new();
        let a = TenantId::new();
        let b = TenantId::new();
        seq.next_entry_number(a, 2024).await.unwrap();
        assert_eq!(seq.next_entry_number(b, 2024).await.unwrap().counter, 1);
        assert_eq!(seq.next_entry_number(a, 2025).await.unwrap().counter, 1);
        assert_eq!(seq.next_entry_number(a, 2024).await.unwrap().counter, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_is_unique() {
        let seq = Arc::new(InMemorySequence::new());
        let tenant = TenantId::new();

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let seq = Arc::clone(&seq);
                tokio::spawn(async move { seq.next_entry_number(tenant, 2024).await })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            let number = handle.await.unwrap().unwrap();
            assert!(seen.insert(number.counter), "duplicate {number}");
        }
        assert_eq!(seen.len(), 64);
        assert_eq!(seen.iter().max(), Some(&64));
    }
}
