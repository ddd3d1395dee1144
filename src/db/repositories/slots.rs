//! Named slots of the persistent key-value area.
//!
//! A slot holds one whole document; writers replace the value wholesale.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::db::Database;

fn load_slot(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_slots WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read slot {key}"))
}

fn store_slot(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_slots (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write slot {key}"))?;
    Ok(())
}

impl Database {
    /// Raw value of a slot, `None` when the key was never written or was deleted.
    pub async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| load_slot(conn, &key)).await
    }

    /// Replace the value of a slot.
    pub async fn write_slot(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| store_slot(conn, &key, &value))
            .await
    }

    /// Delete a slot. Returns whether a value was present.
    pub async fn delete_slot(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM kv_slots WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete slot {key}"))?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Read-modify-write of one slot as a single immediate transaction.
    ///
    /// `update` receives the current value and returns the replacement plus a
    /// value handed back to the caller. Nothing is written if `update` fails.
    pub async fn update_slot<F, T>(&self, key: &str, update: F) -> Result<T>
    where
        F: FnOnce(Option<String>) -> Result<(String, T)> + Send + 'static,
        T: Send + 'static,
    {
        let key = key.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .context("failed to open slot transaction")?;

            let current = load_slot(&tx, &key)?;
            let (next, output) = update(current)?;
            store_slot(&tx, &key, &next)?;

            tx.commit()
                .with_context(|| format!("failed to commit slot {key}"))?;
            Ok(output)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::db::Database;

    #[tokio::test]
    async fn missing_slot_reads_as_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.read_slot("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_replaces_previous_value() {
        let db = Database::open_in_memory().unwrap();
        db.write_slot("k", "[1]".into()).await.unwrap();
        db.write_slot("k", "[1,2]".into()).await.unwrap();
        assert_eq!(db.read_slot("k").await.unwrap().as_deref(), Some("[1,2]"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let db = Database::open_in_memory().unwrap();
        db.write_slot("k", "{}".into()).await.unwrap();

        assert!(db.delete_slot("k").await.unwrap());
        assert!(!db.delete_slot("k").await.unwrap());
        assert_eq!(db.read_slot("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_sees_current_value_and_returns_output() {
        let db = Database::open_in_memory().unwrap();
        db.write_slot("counter", "41".into()).await.unwrap();

        let seen = db
            .update_slot("counter", |current| {
                let value: i64 = current.unwrap_or_default().parse()?;
                Ok(((value + 1).to_string(), value))
            })
            .await
            .unwrap();

        assert_eq!(seen, 41);
        assert_eq!(db.read_slot("counter").await.unwrap().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn failed_update_leaves_slot_untouched() {
        let db = Database::open_in_memory().unwrap();
        db.write_slot("k", "original".into()).await.unwrap();

        let result = db
            .update_slot("k", |_| -> anyhow::Result<(String, ())> { bail!("refused") })
            .await;

        assert!(result.is_err());
        assert_eq!(db.read_slot("k").await.unwrap().as_deref(), Some("original"));
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let db = Database::open_in_memory().unwrap();
        db.write_slot("counter", "0".into()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..25 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.update_slot("counter", |current| {
                    let value: i64 = current.unwrap_or_default().parse()?;
                    Ok(((value + 1).to_string(), ()))
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.read_slot("counter").await.unwrap().as_deref(), Some("25"));
    }
}
