/*!
 * SQLite handle shared by every ingestion worker.
 *
 * One connection sits behind a mutex; async callers reach it through
 * `spawn_blocking` so a slow write never stalls the runtime. Steps of a
 * single movie are serialized by the orchestrator, so one connection is
 * enough for the batch pool.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::models::DatabaseStats;
use super::schema;

const DB_FILENAME: &str = "screenwise.db";
const DATA_DIRNAME: &str = "screenwise";

/// How long a writer waits on a locked file before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Shared = Arc<Mutex<Connection>>;

/// Cloneable handle to the movie store
#[derive(Clone)]
pub struct DatabaseConnection {
    location: PathBuf,
    conn: Shared,
}

impl DatabaseConnection {
    /// Open the store under the user's data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Open (or create) the store file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let location = path.as_ref().to_path_buf();
        if let Some(dir) = location.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("Cannot create store directory {:?}", dir))?;
        }

        info!("Movie store: {:?}", location);
        let conn = Connection::open(&location).with_context(|| format!("Cannot open movie store {:?}", location))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::prepared(conn, location)
    }

    /// Private in-memory store, used by tests and benchmarks
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory movie store");
        let conn = Connection::open_in_memory().context("Cannot open in-memory movie store")?;
        Self::prepared(conn, PathBuf::from(":memory:"))
    }

    fn prepared(conn: Connection, location: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<data dir>/screenwise/screenwise.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("No data directory available for the movie store"))?;
        Ok(base.join(DATA_DIRNAME).join(DB_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    fn lock(conn: &Shared) -> Result<MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| anyhow!("Movie store lock poisoned"))
    }

    /// Run `f` on the calling thread
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = Self::lock(&self.conn)?;
        f(&*guard)
    }

    /// Run `f` on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = Self::lock(&conn)?;
            f(&*guard)
        })
        .await
            .context("Movie store task panicked")?
    }

    /// Run `f` inside a transaction on the blocking pool.
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls it back.
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = Self::lock(&conn)?;
            let tx = guard.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .context("Movie store transaction panicked")?
    }

    /// Row counts by workflow state
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };
            let in_state = |state: &str| -> Result<i64> {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM movies WHERE workflow_state = ?1",
                    [state],
                    |row| row.get(0),
                )?)
            };

            Ok(DatabaseStats {
                movie_count: count("SELECT COUNT(*) FROM movies")?,
                completed_count: in_state("completed")?,
                paused_count: in_state("needs_manual_subtitles")?,
                failed_count: in_state("failed")?,
                scene_count: count("SELECT COUNT(*) FROM scenes")?,
                run_count: count("SELECT COUNT(*) FROM analysis_runs")?,
            })
        })
    }
}
