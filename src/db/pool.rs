//! PostgreSQL connection pool, with an in-memory SQLite variant for tests.
use anyhow::{Context, Result};
use derive_builder::Builder;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;

use super::insert::{bind_record_fields, build_insert_sql};
use super::schema::{Schema, quote_ident};
use crate::config::CONNECT_TIMEOUT;
use crate::formats::Record;

/// Inner pool variants
#[derive(Debug, Clone)]
enum PoolInner {
    Postgres(sqlx::PgPool),
    #[cfg(test)]
    Sqlite(sqlx::SqlitePool),
}

#[derive(Debug, Clone)]
pub struct Pool {
    inner: PoolInner,
}

/// Connection parameters, as given on the command line
#[derive(Builder, Clone)]
pub struct PoolArgs {
    #[builder(setter(into))]
    host: String,
    port: u16,
    #[builder(setter(into))]
    username: String,
    #[builder(setter(into))]
    password: String,
    #[builder(setter(into))]
    database: String,
    /// Stages run strictly in sequence, so one connection is all they use
    #[builder(default = "1")]
    max_connections: u32,
}

impl PoolArgs {
    /// Connection URL with the password masked, for logs and console output
    pub fn display_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for PoolArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_url())
    }
}

pub async fn pool(args: PoolArgs) -> Result<Pool> {
    let display_url = args.display_url();
    let PoolArgs {
        host,
        port,
        username,
        password,
        database,
        max_connections,
    } = args;

    let connect_options = PgConnectOptions::new()
        .host(&host)
        .port(port)
        .username(&username)
        .password(&password)
        .database(&database);

    let pg_pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect_with(connect_options)
        .await
        .with_context(|| format!("Failed to connect to {display_url}"))?;

    info!(url = %display_url, "connected to database");

    Ok(Pool {
        inner: PoolInner::Postgres(pg_pool),
    })
}

impl Pool {
    /// Create an in-memory SQLite pool for testing
    ///
    /// Capped at one connection: every connection to `sqlite::memory:` opens a
    /// separate database.
    #[cfg(test)]
    pub async fn sqlite_in_memory() -> Result<Self, sqlx::Error> {
        let sqlite_pool = sqlx::sqlite::SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Pool {
            inner: PoolInner::Sqlite(sqlite_pool),
        })
    }

    /// Connect to the PostgreSQL server at `url` for tests that need a real server
    #[cfg(test)]
    pub async fn postgres_from_url(url: &str) -> Result<Self, sqlx::Error> {
        let pg_pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await?;

        Ok(Pool {
            inner: PoolInner::Postgres(pg_pool),
        })
    }

    /// Direct access to the PostgreSQL pool backing a test pool
    #[cfg(test)]
    pub fn postgres(&self) -> &sqlx::PgPool {
        match &self.inner {
            PoolInner::Postgres(pool) => pool,
            PoolInner::Sqlite(_) => panic!("Not a PostgreSQL pool"),
        }
    }

    /// Direct access to the SQLite pool backing a test pool
    #[cfg(test)]
    pub fn sqlite(&self) -> &sqlx::SqlitePool {
        match &self.inner {
            PoolInner::Sqlite(pool) => pool,
            PoolInner::Postgres(_) => panic!("Not a SQLite pool"),
        }
    }

    /// Run statements in order inside a single transaction
    pub async fn execute_in_transaction(&self, statements: &[String]) -> Result<()> {
        match &self.inner {
            PoolInner::Postgres(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for sql in statements {
                    sqlx::query(sql)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| format!("Failed to execute: {sql}"))?;
                }
                tx.commit().await.context("Failed to commit transaction")?;
            }
            #[cfg(test)]
            PoolInner::Sqlite(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for sql in statements {
                    sqlx::query(sql)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| format!("Failed to execute: {sql}"))?;
                }
                tx.commit().await.context("Failed to commit transaction")?;
            }
        }
        Ok(())
    }

    /// Insert records into `table_name` as one transaction
    ///
    /// Records are split across multi-row INSERT statements of at most
    /// `rows_per_statement` rows. Either every record is committed or none is.
    pub async fn insert_records(
        &self,
        table_name: &str,
        schema: &Schema,
        records: &[Record],
        rows_per_statement: usize,
    ) -> Result<()> {
        match &self.inner {
            PoolInner::Postgres(pool) => {
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for chunk in records.chunks(rows_per_statement) {
                    let sql = build_insert_sql(table_name, schema, chunk.len(), true);
                    let mut query = sqlx::query(&sql);
                    for record in chunk {
                        query = bind_record_fields(query, &record.fields, schema)?;
                    }
                    query
                        .execute(&mut *tx)
                        .await
                        .context("Failed to execute batch insert")?;
                }
                tx.commit().await.context("Failed to commit batch")?;
            }
            #[cfg(test)]
            PoolInner::Sqlite(pool) => {
                // SQLite: plain text binding, column affinity handles conversion
                let mut tx = pool.begin().await.context("Failed to begin transaction")?;
                for chunk in records.chunks(rows_per_statement) {
                    let sql = super::insert::convert_to_sqlite_placeholders(&build_insert_sql(
                        table_name,
                        schema,
                        chunk.len(),
                        false,
                    ));
                    let mut query = sqlx::query(&sql);
                    for record in chunk {
                        for field in &record.fields {
                            query = query.bind(field.as_deref());
                        }
                    }
                    query
                        .execute(&mut *tx)
                        .await
                        .context("Failed to execute batch insert")?;
                }
                tx.commit().await.context("Failed to commit batch")?;
            }
        }
        Ok(())
    }

    /// Count the rows currently in `table_name`
    pub async fn count_rows(&self, table_name: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table_name));
        let (count,): (i64,) = match &self.inner {
            PoolInner::Postgres(pool) => sqlx::query_as(&sql).fetch_one(pool).await,
            #[cfg(test)]
            PoolInner::Sqlite(pool) => sqlx::query_as(&sql).fetch_one(pool).await,
        }
        .with_context(|| format!("Failed to count rows in '{table_name}'"))?;
        Ok(count)
    }
}
