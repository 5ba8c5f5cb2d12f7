//! libSQL backend — async `ResponseStore` implementation.
//!
//! Supports local file and in-memory databases. A single connection is shared
//! by every request; concurrent appends are serialized by SQLite itself, and
//! each append is one `INSERT … RETURNING` statement so the returned id always
//! belongs to the caller's row.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{NewResponseRecord, ResponseRecord, ResponseStore, ResponseStream};

/// Column order read by `row_to_record`.
const RESPONSE_COLUMNS: &str =
    "id, sender_id, response_text, completed_transaction, created_at, message_id";

/// libSQL response store.
pub struct LibSqlResponseStore {
    /// Held so the database outlives `conn`; never read directly.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlResponseStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Response store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let store = Self::from_database(db)?;
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Map a libsql Row (RESPONSE_COLUMNS order) to a ResponseRecord.
fn row_to_record(row: &libsql::Row) -> Result<ResponseRecord, libsql::Error> {
    let flag: i64 = row.get(3)?;
    let created_str: Option<String> = row.get(4).ok();

    Ok(ResponseRecord {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        response_text: row.get(2)?,
        completed_transaction: flag != 0,
        created_at: created_str.as_deref().and_then(parse_datetime),
        message_id: row.get(5).ok(),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ResponseStore for LibSqlResponseStore {
    async fn claim_message(&self, message_id: &str) -> Result<bool, DatabaseError> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO message_claims (message_id) VALUES (?1)",
                params![message_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("claim_message: {e}")))?;
        Ok(inserted == 1)
    }

    async fn append(&self, record: &NewResponseRecord) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let message_id = match &record.message_id {
            Some(mid) => libsql::Value::Text(mid.clone()),
            None => libsql::Value::Null,
        };
        let mut rows = self
            .conn
            .query(
                "INSERT INTO responses (sender_id, response_text, completed_transaction, created_at, message_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![
                    record.sender_id.as_str(),
                    record.response_text.as_str(),
                    i64::from(record.completed_transaction),
                    now,
                    message_id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_response: {e}")))?;

        let id: i64 = match rows.next().await {
            Ok(Some(row)) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("append_response id: {e}")))?,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "append_response: insert returned no id".into(),
                ));
            }
            Err(e) => return Err(DatabaseError::Query(format!("append_response: {e}"))),
        };

        debug!(id, sender = %record.sender_id, "Response appended");
        Ok(id)
    }

    async fn list_all(&self) -> ResponseStream {
        let rows = match self
            .conn
            .query(
                &format!("SELECT {RESPONSE_COLUMNS} FROM responses ORDER BY id ASC"),
                (),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, stage = "list_responses", "Failed to query responses");
                return Box::pin(stream::empty());
            }
        };

        Box::pin(stream::unfold(rows, |mut rows| async move {
            loop {
                match rows.next().await {
                    Ok(Some(row)) => match row_to_record(&row) {
                        Ok(record) => return Some((record, rows)),
                        Err(e) => warn!("Skipping response row: {e}"),
                    },
                    Ok(None) => return None,
                    Err(e) => {
                        warn!(error = %e, stage = "list_responses", "Response scan aborted");
                        return None;
                    }
                }
            }
        }))
    }
}
