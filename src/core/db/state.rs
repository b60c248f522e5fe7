use sqlx::{
    Sqlite,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous},
};
use tokio::sync::{RwLock, RwLockReadGuard};

use std::{
    fs,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use anyhow::Context;

use crate::core::db::storage::Storage;

/// Key-value storage in a single SQLite file.
pub struct SqliteStorage {
    db_file: PathBuf,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("db_file", &self.db_file)
            .finish()
    }
}

impl SqliteStorage {
    /// Open (or create) the database at `db_file` and run the embedded migrations.
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();
        if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create storage directory {:?}", parent))?;
        }

        let pool = Self::connect(&db_file).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(db_file = ?db_file, "opened sqlite storage");
        Ok(Self {
            db_file,
            pool: RwLock::new(pool),
        })
    }

    async fn connect(db_file: &Path) -> anyhow::Result<SqlitePool> {
        let connect_opts = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open storage database {:?}", db_file))
    }

    pub fn db_file(&self) -> &Path {
        &self.db_file
    }

    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // Acquired while the read lock is held; `close` waits for it.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Flush the WAL into the main database file and release all connections.
    ///
    /// Waits for in-flight reads and writes because it takes the pool write lock.
    pub async fn close(&self) -> anyhow::Result<()> {
        let pool_guard = self.pool.write().await;

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await?;
        pool_guard.close().await;
        tracing::debug!(db_file = ?self.db_file, "closed sqlite storage");
        Ok(())
    }
}

impl Storage for SqliteStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn().await?;
        let value = sqlx::query_scalar::<_, String>(
            r#"SELECT value FROM local_storage WHERE key = $1"#,
        )
        .bind(key)
        .fetch_optional(&mut **conn)
        .await
        .with_context(|| format!("Failed to read storage key {:?}", key))?;
        Ok(value)
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        sqlx::query(
            r#"INSERT INTO local_storage (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut **conn)
        .await
        .with_context(|| format!("Failed to write storage key {:?}", key))?;
        Ok(())
    }
}

struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
