//! SQLite-backed message and webhook storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{require_message_id, require_webhook_id};
use super::{MessageStore, StoreError, StoreResult, WebhookStore};
use crate::models::{Message, MessageId, MessageQuery, MessageStatus, WebhookConfig};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE messages (
                msg_id TEXT PRIMARY KEY,
                from_email TEXT NOT NULL,
                to_email TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                html_body TEXT NOT NULL DEFAULT '',
                text_body TEXT,
                status TEXT NOT NULL,
                smtp_response TEXT,
                reason TEXT,
                timestamp INTEGER NOT NULL,
                last_event_time INTEGER NOT NULL DEFAULT 0,
                opens_count INTEGER NOT NULL DEFAULT 0,
                clicks_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_status ON messages(status);
            CREATE INDEX idx_messages_timestamp ON messages(timestamp);

            -- events holds a JSON array of status tags
            CREATE TABLE webhooks (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                events TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                secret TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        ),
    ])
}

const MESSAGE_COLUMNS: &str = "msg_id, from_email, to_email, subject, html_body, text_body, \
     status, smtp_response, reason, timestamp, last_event_time, opens_count, clicks_count";

const WEBHOOK_COLUMNS: &str = "id, url, events, enabled, secret, created_at, updated_at";

impl ToSql for MessageStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MessageStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<MessageStatus>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// SQLite storage for both messages and webhook subscriptions
///
/// A single connection behind a mutex serializes all access. `close` drops
/// the connection; later calls fail with an I/O error.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `db_path` and bring its schema up to date
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(|e| {
            StoreError::io(format!("open database at {}: {}", db_path.display(), e))
        })?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        // WAL lets list queries run while a save is in flight
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        migrations().to_latest(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run `f` against the open connection
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard: MutexGuard<'_, Option<Connection>> =
            self.conn.lock().map_err(|_| StoreError::poisoned())?;
        let conn = guard.as_ref().ok_or_else(StoreError::closed)?;
        f(conn)
    }

    fn close_inner(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::poisoned())?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StoreError::from(e))?;
        }
        Ok(())
    }

    fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
        Ok(Message {
            id: MessageId(row.get(0)?),
            from: row.get(1)?,
            to: row.get(2)?,
            subject: row.get(3)?,
            html_body: row.get(4)?,
            text_body: row.get(5)?,
            status: row.get(6)?,
            transport_response: row.get(7)?,
            reason: row.get(8)?,
            created_at: row.get(9)?,
            last_event_at: row.get(10)?,
            opens_count: row.get(11)?,
            clicks_count: row.get(12)?,
        })
    }

    fn row_to_webhook(row: &Row<'_>) -> rusqlite::Result<WebhookConfig> {
        let events_json: String = row.get(2)?;
        let events = serde_json::from_str(&events_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(WebhookConfig {
            id: row.get(0)?,
            url: row.get(1)?,
            events,
            enabled: row.get(3)?,
            secret: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn list_webhooks(&self, enabled_only: bool) -> StoreResult<Vec<WebhookConfig>> {
        let filter = if enabled_only { "WHERE enabled = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM webhooks {} ORDER BY created_at DESC, id ASC",
            WEBHOOK_COLUMNS, filter
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let hooks = stmt
                .query_map([], Self::row_to_webhook)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(hooks)
        })
    }
}

impl MessageStore for SqliteStore {
    fn save(&self, message: &Message) -> StoreResult<()> {
        require_message_id(message)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (
                    msg_id, from_email, to_email, subject, html_body, text_body,
                    status, smtp_response, reason, timestamp, last_event_time,
                    opens_count, clicks_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ON CONFLICT(msg_id) DO UPDATE SET
                    from_email = excluded.from_email,
                    to_email = excluded.to_email,
                    subject = excluded.subject,
                    html_body = excluded.html_body,
                    text_body = excluded.text_body,
                    status = excluded.status,
                    smtp_response = excluded.smtp_response,
                    reason = excluded.reason,
                    timestamp = excluded.timestamp,
                    last_event_time = excluded.last_event_time,
                    opens_count = excluded.opens_count,
                    clicks_count = excluded.clicks_count",
                params![
                    message.id.as_str(),
                    message.from,
                    message.to,
                    message.subject,
                    message.html_body,
                    message.text_body,
                    message.status,
                    message.transport_response,
                    message.reason,
                    message.created_at,
                    message.last_event_at,
                    message.opens_count,
                    message.clicks_count,
                ],
            )?;
            Ok(())
        })
    }

    fn get(&self, query: &MessageQuery) -> StoreResult<Vec<Message>> {
        if let Some(id) = &query.id {
            return self.with_conn(|conn| {
                let found = conn
                    .query_row(
                        &format!("SELECT {} FROM messages WHERE msg_id = ?1", MESSAGE_COLUMNS),
                        [id.as_str()],
                        Self::row_to_message,
                    )
                    .optional()?;
                Ok(found.into_iter().collect())
            });
        }

        // SQLite reads a negative LIMIT/OFFSET as "none", so clamp instead of wrapping
        let limit = i64::try_from(query.effective_limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        self.with_conn(|conn| {
            let messages = match query.status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM messages WHERE status = ?1
                         ORDER BY timestamp DESC, msg_id ASC LIMIT ?2 OFFSET ?3",
                        MESSAGE_COLUMNS
                    ))?;
                    stmt.query_map(params![status, limit, offset], Self::row_to_message)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM messages
                         ORDER BY timestamp DESC, msg_id ASC LIMIT ?1 OFFSET ?2",
                        MESSAGE_COLUMNS
                    ))?;
                    stmt.query_map(params![limit, offset], Self::row_to_message)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(messages)
        })
    }

    fn close(&self) -> StoreResult<()> {
        self.close_inner()
    }
}

impl WebhookStore for SqliteStore {
    fn create(&self, hook: &WebhookConfig) -> StoreResult<()> {
        require_webhook_id(&hook.id)?;
        let events = serde_json::to_string(&hook.events)?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                &format!(
                    "INSERT INTO webhooks ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO NOTHING",
                    WEBHOOK_COLUMNS
                ),
                params![
                    hook.id,
                    hook.url,
                    events,
                    hook.enabled,
                    hook.secret,
                    hook.created_at,
                    hook.updated_at,
                ],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyExists {
                    resource: format!("webhook {}", hook.id),
                });
            }
            Ok(())
        })
    }

    fn get(&self, id: &str) -> StoreResult<WebhookConfig> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM webhooks WHERE id = ?1", WEBHOOK_COLUMNS),
                [id],
                Self::row_to_webhook,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(format!("webhook {}", id)))
        })
    }

    fn list(&self) -> StoreResult<Vec<WebhookConfig>> {
        self.list_webhooks(false)
    }

    fn list_enabled(&self) -> StoreResult<Vec<WebhookConfig>> {
        self.list_webhooks(true)
    }

    fn update(&self, hook: &WebhookConfig) -> StoreResult<()> {
        let events = serde_json::to_string(&hook.events)?;
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE webhooks
                 SET url = ?1, events = ?2, enabled = ?3, secret = ?4,
                     created_at = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    hook.url,
                    events,
                    hook.enabled,
                    hook.secret,
                    hook.created_at,
                    hook.updated_at,
                    hook.id,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::not_found(format!("webhook {}", hook.id)));
            }
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM webhooks WHERE id = ?1", [id])?;
            if deleted == 0 {
                return Err(StoreError::not_found(format!("webhook {}", id)));
            }
            Ok(())
        })
    }

    fn close(&self) -> StoreResult<()> {
        self.close_inner()
    }
}
