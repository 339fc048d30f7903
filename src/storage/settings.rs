//! Durable settings document: saved topics and the active selection.
//!
//! The whole document lives in one row and is replaced transactionally on
//! every write. Readers subscribe through a `tokio::sync::watch` channel, so
//! each subscriber sees the current document first and then every distinct
//! change in the order it was committed.

use futures::stream::{self, Stream, StreamExt};
use tokio::sync::{watch, Mutex};

use super::schema::Database;
use super::types::{
    ActiveTopics, SelectionMode, StoreError, Topic, TopicSettings, TopicSettingsV1,
    SETTINGS_VERSION,
};

const UPSERT_DOCUMENT: &str = r#"
    INSERT INTO settings_document (id, version, body, updated_at)
    VALUES (1, ?, ?, datetime('now'))
    ON CONFLICT(id) DO UPDATE SET
        version = excluded.version,
        body = excluded.body,
        updated_at = excluded.updated_at
"#;

/// Settings store backed by the `settings_document` table.
pub struct SettingsStore {
    db: Database,
    tx: watch::Sender<TopicSettings>,
    /// Serializes read-modify-write cycles. SQLite would otherwise surface
    /// SQLITE_BUSY when two deferred transactions both try to upgrade.
    write_lock: Mutex<()>,
    fresh: bool,
}

impl SettingsStore {
    /// Load the stored document, migrating older schema versions in place.
    ///
    /// # Errors
    ///
    /// - `StoreError::Corrupt` if the body cannot be decoded
    /// - `StoreError::UnsupportedVersion` if it was written by a newer schema
    pub async fn open(db: Database) -> Result<Self, StoreError> {
        let row = read_row(&db.pool).await?;
        let fresh = row.is_none();

        let settings = match row {
            None => TopicSettings::default(),
            Some((version, body)) => {
                let settings = decode_document(version, &body)?;
                if version != SETTINGS_VERSION {
                    tracing::info!(
                        from = version,
                        to = SETTINGS_VERSION,
                        "Migrating settings document"
                    );
                    write_row(&db.pool, &settings).await?;
                }
                settings
            }
        };

        let (tx, _rx) = watch::channel(settings);
        Ok(Self {
            db,
            tx,
            write_lock: Mutex::new(()),
            fresh,
        })
    }

    /// True when no document existed at open time (first run).
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Latest committed document.
    pub fn snapshot(&self) -> TopicSettings {
        self.tx.borrow().clone()
    }

    /// Stream of documents: the current one immediately, then each committed change.
    pub fn observe(&self) -> impl Stream<Item = TopicSettings> + Send + 'static {
        let rx = self.tx.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let settings = rx.borrow_and_update().clone();
            Some((settings, (rx, false)))
        })
    }

    /// Saved topic list, emitted only when it actually changes.
    pub fn saved_topics(&self) -> impl Stream<Item = Vec<Topic>> + Send + 'static {
        distinct(self.observe().map(|s| s.topic_list))
    }

    /// Active selection as seen through `mode`, emitted only when it changes.
    pub fn active_topics(
        &self,
        mode: SelectionMode,
    ) -> impl Stream<Item = Option<ActiveTopics>> + Send + 'static {
        distinct(self.observe().map(move |s| s.active(mode)))
    }

    /// Atomically read, modify and write the document.
    ///
    /// `f` runs against the latest stored snapshot, not the in-memory copy.
    /// If it leaves the document unchanged nothing is written and no
    /// subscriber is woken. Returns whatever `f` returns.
    pub async fn update<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut TopicSettings) -> T,
    {
        let _guard = self.write_lock.lock().await;

        let mut tx = self.db.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, body FROM settings_document WHERE id = 1")
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::from_sqlx)?;
        let current = match row {
            Some((version, body)) => decode_document(version, &body)?,
            None => TopicSettings::default(),
        };

        let mut next = current.clone();
        let out = f(&mut next);
        let next = next.normalized();

        if next == current {
            tx.rollback().await.map_err(StoreError::from_sqlx)?;
            return Ok(out);
        }

        let body = encode_document(&next)?;
        sqlx::query(UPSERT_DOCUMENT)
            .bind(SETTINGS_VERSION)
            .bind(&body)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        tx.commit().await.map_err(StoreError::from_sqlx)?;

        tracing::debug!(
            saved = next.topic_list.len(),
            active = next.current_topics.len(),
            "Settings document updated"
        );

        self.tx.send_if_modified(|cur| {
            if *cur == next {
                false
            } else {
                *cur = next;
                true
            }
        });

        Ok(out)
    }
}

/// Drop consecutive duplicates from a stream.
fn distinct<S, T>(inner: S) -> impl Stream<Item = T> + Send + 'static
where
    S: Stream<Item = T> + Send + 'static,
    T: PartialEq + Clone + Send + 'static,
{
    let mut last: Option<T> = None;
    inner.filter_map(move |item| {
        let emit = last.as_ref() != Some(&item);
        if emit {
            last = Some(item.clone());
        }
        futures::future::ready(emit.then_some(item))
    })
}

async fn read_row(pool: &sqlx::SqlitePool) -> Result<Option<(i64, String)>, StoreError> {
    let row = sqlx::query_as("SELECT version, body FROM settings_document WHERE id = 1")
        .fetch_optional(pool)
        .await
        .map_err(StoreError::from_sqlx)?;
    Ok(row)
}

async fn write_row(pool: &sqlx::SqlitePool, settings: &TopicSettings) -> Result<(), StoreError> {
    let body = encode_document(settings)?;
    sqlx::query(UPSERT_DOCUMENT)
        .bind(SETTINGS_VERSION)
        .bind(body)
        .execute(pool)
        .await
        .map_err(StoreError::from_sqlx)?;
    Ok(())
}

/// Decode a stored body according to its schema version.
pub(crate) fn decode_document(version: i64, body: &str) -> Result<TopicSettings, StoreError> {
    match version {
        1 => serde_json::from_str::<TopicSettingsV1>(body)
            .map(TopicSettings::from)
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        SETTINGS_VERSION => serde_json::from_str::<TopicSettings>(body)
            .map(TopicSettings::normalized)
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        other => Err(StoreError::UnsupportedVersion(other)),
    }
}

fn encode_document(settings: &TopicSettings) -> Result<String, StoreError> {
    serde_json::to_string(settings).map_err(|e| StoreError::Corrupt(e.to_string()))
}
