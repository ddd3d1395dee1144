use std::{
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

pub mod helpers;
mod migrations;
pub mod repositories;

use migrations::run_migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Handle to the SQLite-backed persistent area.
///
/// Every statement runs on one dedicated worker thread, so tasks submitted
/// through [`Database::execute`] are applied one at a time in arrival order.
/// Cloning is cheap and all clones share the same worker.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<Option<PathBuf>>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let inner = spawn_worker(move || {
            Connection::open(&path_for_thread).context("failed to open SQLite database")
        })?;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(inner),
            db_path: Arc::new(Some(db_path)),
        })
    }

    /// Private database that lives as long as the handle. Used by tests and
    /// dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let inner = spawn_worker(|| {
            Connection::open_in_memory().context("failed to open in-memory SQLite database")
        })?;

        Ok(Self {
            inner: Arc::new(inner),
            db_path: Arc::new(None),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_ref().as_deref()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database task ended without a result"))?
    }
}

fn spawn_worker<F>(open: F) -> Result<DatabaseInner>
where
    F: FnOnce() -> Result<Connection> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    let worker = thread::Builder::new()
        .name("contact-ledger-db".into())
        .spawn(move || {
            let mut conn = match open() {
                Ok(connection) => connection,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }
            if let Err(err) = conn.busy_timeout(BUSY_TIMEOUT) {
                error!("Failed to set busy timeout: {err}");
            }

            let init_result =
                run_migrations(&mut conn).context("failed to run database migrations");
            if ready_tx.send(init_result).is_err() {
                error!("DB initialization receiver dropped before ready signal");
                return;
            }

            while let Ok(command) = command_rx.recv() {
                match command {
                    DbCommand::Execute(task) => {
                        // A panicking task drops its reply sender; the caller sees an error
                        // and the connection stays available for the next task.
                        if panic::catch_unwind(AssertUnwindSafe(|| task(&mut conn))).is_err() {
                            error!("DB task panicked; continuing with the next command");
                        }
                    }
                    DbCommand::Shutdown => break,
                }
            }

            info!("Database thread shutting down");
        })
        .with_context(|| "failed to spawn database worker thread")?;

    ready_rx
        .recv()
        .context("database worker exited before signaling readiness")??;

    Ok(DatabaseInner {
        sender: command_tx,
        worker: Mutex::new(Some(worker)),
    })
}
