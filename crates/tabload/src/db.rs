//! PostgreSQL access
//!
//! All statements of a run go over a single [`PgConnection`] borrowed
//! mutably, one round-trip each.

use crate::batch::{RowBatch, Value};
use crate::config::DbConfig;
use crate::error::{LoadError, Result};
use crate::schema::{insert_prefix, TableSpec};
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use tracing::{debug, info};

/// PostgreSQL's limit on bind parameters per statement
pub const MAX_BIND_PARAMS: usize = 65_535;

pub async fn connect(config: &DbConfig) -> Result<PgConnection> {
    let options = config.to_connect_options()?;
    debug!(config = ?config, "Connecting to database");

    match tokio::time::timeout(config.connect_timeout(), PgConnection::connect_with(&options))
        .await
    {
        Ok(conn) => Ok(conn?),
        Err(_) => Err(LoadError::Database(sqlx::Error::Io(
            std::io::ErrorKind::TimedOut.into(),
        ))),
    }
}

/// Whether a table of that name exists in any schema the catalog shows.
pub async fn table_exists(conn: &mut PgConnection, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

pub async fn create_table(conn: &mut PgConnection, spec: &TableSpec) -> Result<()> {
    let sql = spec.create_table_sql();
    debug!(table = spec.name.as_str(), %sql, "Creating table");

    sqlx::query(&sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| LoadError::ddl(spec.name.as_str(), e))?;

    info!(table = spec.name.as_str(), "Created table");
    Ok(())
}

/// Rows per INSERT so that one statement stays under the bind limit.
pub fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

/// Insert every row of `batch` in one transaction.
///
/// Returns the number of rows inserted. An empty batch issues no statement.
/// Any failure rolls the whole batch back.
pub async fn insert_batch(
    conn: &mut PgConnection,
    spec: &TableSpec,
    batch: &RowBatch,
) -> Result<usize> {
    if batch.row_count() == 0 {
        debug!(table = spec.name.as_str(), "Empty batch, nothing to insert");
        return Ok(0);
    }

    let table = spec.name.as_str();
    let prefix = insert_prefix(&spec.name, &spec.column_names());
    let chunk_size = rows_per_statement(batch.column_count());

    let mut tx = conn
        .begin()
        .await
        .map_err(|e| LoadError::insert(table, e))?;

    let mut inserted = 0;
    for chunk in batch.rows().chunks(chunk_size) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());

        query_builder.push_values(chunk, |mut b, row| {
            for value in row {
                match value {
                    // Untyped literal, so it takes the column's type
                    Value::Null => {
                        b.push("NULL");
                    },
                    Value::Boolean(v) => {
                        b.push_bind(*v);
                    },
                    Value::Integer(v) => {
                        b.push_bind(*v);
                    },
                    Value::Numeric(v) => {
                        b.push_bind(*v);
                    },
                    Value::Text(v) => {
                        b.push_bind(v.as_str());
                    },
                    Value::Timestamp(v) => {
                        b.push_bind(*v);
                    },
                }
            }
        });

        let executed = query_builder.build().execute(&mut *tx).await;
        if let Err(e) = executed {
            if let Err(rollback) = tx.rollback().await {
                debug!(table, error = %rollback, "Rollback failed");
            }
            return Err(LoadError::insert(table, e));
        }

        inserted += chunk.len();
        debug!(table, rows = chunk.len(), "Inserted chunk");
    }

    tx.commit().await.map_err(|e| LoadError::insert(table, e))?;

    Ok(inserted)
}
