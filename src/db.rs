use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqliteConnection, SqlitePool,
};

/// Open the pool with foreign keys enforced on every connection.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse DATABASE_URL {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // Each in-memory connection is its own database.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 10 };

    let db = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Apply the embedded schema. Every statement is `IF NOT EXISTS`, so this is safe to repeat.
pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Transaction opened with `BEGIN IMMEDIATE`: the write lock is taken up front,
/// so reads inside it cannot go stale before the write.
///
/// Dropped without `commit`/`rollback`, the connection is detached and closed
/// (SQLite rolls back on close) rather than returned to the pool mid-transaction.
pub struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    pub async fn begin(db: &SqlitePool) -> sqlx::Result<Self> {
        let mut conn = db.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub fn conn(&mut self) -> sqlx::Result<&mut SqliteConnection> {
        self.conn.as_deref_mut().ok_or(sqlx::Error::PoolClosed)
    }

    pub async fn commit(self) -> sqlx::Result<()> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(self) -> sqlx::Result<()> {
        self.finish("ROLLBACK").await
    }

    async fn finish(mut self, stmt: &'static str) -> sqlx::Result<()> {
        if let Some(conn) = self.conn.as_deref_mut() {
            sqlx::query(stmt).execute(conn).await?;
        }
        // back to the pool only once the transaction is closed
        self.conn.take();
        Ok(())
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("write transaction abandoned; closing its connection");
            drop(conn.detach());
        }
    }
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let db = connect("sqlite::memory:").await.expect("memory pool");
    migrate(&db).await.expect("migrations");
    db
}
