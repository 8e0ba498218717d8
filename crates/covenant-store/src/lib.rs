//! Covenant Storage Layer
//!
//! Implements the ObligationStore trait on SQLite.
//!
//! The store is an ordinary value: open it, hand it to whoever needs it, and
//! drop it (or call [`SqliteStore::close`]) when done. Nothing is global.
//!
//! # Examples
//!
//! ```no_run
//! use covenant_store::SqliteStore;
//!
//! let store = SqliteStore::open(":memory:").unwrap();
//! // Store is now ready for obligation operations
//! ```

#![warn(missing_docs)]

use covenant_domain::traits::ObligationStore;
use covenant_domain::{
    Obligation, ObligationId, ObligationPage, ObligationQuery, ObligationSet, ObligationUpdate,
    Pagination, Priority,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

/// Deadline recorded when the extraction gave none
pub const UNSPECIFIED_DEADLINE: &str = "Not specified";

const COLUMNS: &str = "id, obligation_text, section, deadline, party_name, priority, \
                       source_document, source_page, created_at, updated_at, issue_id";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of ObligationStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store between tasks
/// behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use covenant_store::SqliteStore;
    ///
    /// let store = SqliteStore::open("obligations.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self { conn };
        store.initialize_schema()?;
        info!(path = %path.as_ref().display(), "Obligation store opened");
        Ok(store)
    }

    /// Close the underlying connection, reporting any error
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Database(e))
    }

    /// Number of stored obligations
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM obligations", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn id_to_bytes(id: ObligationId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_id(bytes: &[u8]) -> Result<ObligationId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!(
                "Expected 16 bytes for ObligationId, got {}",
                bytes.len()
            ))
        })?;
        Ok(ObligationId::from_value(u128::from_be_bytes(arr)))
    }

    fn row_to_obligation(row: &Row<'_>) -> rusqlite::Result<Obligation> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e))
        })?;

        let priority_str: String = row.get(5)?;
        let priority = Priority::parse(&priority_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidData(format!(
                    "Unknown priority: {}",
                    priority_str
                ))),
            )
        })?;

        let source_page: Option<i64> = row.get(7)?;

        Ok(Obligation {
            id,
            obligation_text: row.get(1)?,
            section: row.get(2)?,
            deadline: row.get(3)?,
            party_name: row.get(4)?,
            priority,
            source_document: row.get(6)?,
            source_page: source_page.map(|p| p as u32),
            created_at: row.get::<_, i64>(8)? as u64,
            updated_at: row.get::<_, i64>(9)? as u64,
            issue_id: row.get(10)?,
        })
    }

    fn write(&self, obligation: &Obligation) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE obligations SET obligation_text = ?2, section = ?3, deadline = ?4,
             party_name = ?5, priority = ?6, updated_at = ?7, issue_id = ?8
             WHERE id = ?1",
            params![
                Self::id_to_bytes(obligation.id),
                &obligation.obligation_text,
                &obligation.section,
                &obligation.deadline,
                &obligation.party_name,
                obligation.priority.as_str(),
                obligation.updated_at as i64,
                &obligation.issue_id,
            ],
        )?;
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl ObligationStore for SqliteStore {
    type Error = StoreError;

    fn store_results(
        &mut self,
        results: &[ObligationSet],
        source_document: Option<&str>,
    ) -> Result<Vec<Obligation>, Self::Error> {
        let now = now_secs();
        let tx = self.conn.transaction()?;
        let mut stored = Vec::new();

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO obligations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                COLUMNS
            ))?;

            for set in results {
                for party in &set.parties {
                    debug!(party = %party.name, count = party.obligations.len(), "Storing obligations");
                    for candidate in &party.obligations {
                        let obligation = Obligation {
                            id: ObligationId::new(),
                            obligation_text: candidate.obligation_text.clone(),
                            section: Some(candidate.section.clone()),
                            deadline: Some(
                                candidate
                                    .deadline
                                    .clone()
                                    .unwrap_or_else(|| UNSPECIFIED_DEADLINE.to_string()),
                            ),
                            party_name: party.name.clone(),
                            priority: Priority::Medium,
                            source_document: source_document.map(str::to_string),
                            source_page: candidate.page_number,
                            created_at: now,
                            updated_at: now,
                            issue_id: None,
                        };

                        stmt.execute(params![
                            Self::id_to_bytes(obligation.id),
                            &obligation.obligation_text,
                            &obligation.section,
                            &obligation.deadline,
                            &obligation.party_name,
                            obligation.priority.as_str(),
                            &obligation.source_document,
                            obligation.source_page.map(i64::from),
                            now as i64,
                            now as i64,
                            &obligation.issue_id,
                        ])?;
                        stored.push(obligation);
                    }
                }
            }
        }

        tx.commit()?;
        info!(count = stored.len(), "Stored obligations");
        Ok(stored)
    }

    fn list(&self, query: &ObligationQuery) -> Result<ObligationPage, Self::Error> {
        let page_size = query.page_size.max(1);
        let filter = query.party_name.as_deref().filter(|p| !p.is_empty());

        let (count_sql, filter_sql) = match filter {
            Some(_) => (
                "SELECT COUNT(*) FROM obligations WHERE party_name = ?1 COLLATE NOCASE",
                "WHERE party_name = ?1 COLLATE NOCASE",
            ),
            None => ("SELECT COUNT(*) FROM obligations", ""),
        };

        let total: i64 = match filter {
            Some(party) => self.conn.query_row(count_sql, params![party], |row| row.get(0))?,
            None => self.conn.query_row(count_sql, [], |row| row.get(0))?,
        };
        let total = total as usize;

        let total_pages = Pagination::total_pages(total, page_size);
        let page = query.page.clamp(1, total_pages);
        let offset = ((page - 1) * page_size) as i64;

        let sql = format!(
            "SELECT {} FROM obligations {} ORDER BY rowid LIMIT {} OFFSET {}",
            COLUMNS, filter_sql, page_size, offset
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let obligations = match filter {
            Some(party) => stmt
                .query_map(params![party], Self::row_to_obligation)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], Self::row_to_obligation)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(ObligationPage {
            obligations,
            total,
            page,
            page_size,
            total_pages,
            pagination: Pagination::new(page, total_pages),
        })
    }

    fn get(&self, id: ObligationId) -> Result<Option<Obligation>, Self::Error> {
        let obligation = self
            .conn
            .query_row(
                &format!("SELECT {} FROM obligations WHERE id = ?1", COLUMNS),
                params![Self::id_to_bytes(id)],
                Self::row_to_obligation,
            )
            .optional()?;
        Ok(obligation)
    }

    fn update(
        &mut self,
        id: ObligationId,
        update: &ObligationUpdate,
    ) -> Result<Option<Obligation>, Self::Error> {
        let Some(mut obligation) = self.get(id)? else {
            return Ok(None);
        };
        update.apply_to(&mut obligation, now_secs());
        self.write(&obligation)?;
        Ok(Some(obligation))
    }

    fn delete(&mut self, id: ObligationId) -> Result<bool, Self::Error> {
        let removed = self.conn.execute(
            "DELETE FROM obligations WHERE id = ?1",
            params![Self::id_to_bytes(id)],
        )?;
        Ok(removed > 0)
    }

    fn set_issue_id(
        &mut self,
        id: ObligationId,
        issue_id: &str,
    ) -> Result<Option<Obligation>, Self::Error> {
        let Some(mut obligation) = self.get(id)? else {
            return Ok(None);
        };
        obligation.issue_id = Some(issue_id.to_string());
        obligation.updated_at = now_secs();
        self.write(&obligation)?;
        Ok(Some(obligation))
    }
}
