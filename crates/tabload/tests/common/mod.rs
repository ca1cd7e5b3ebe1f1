//! Shared helpers for tabload integration tests
//!
//! Each test starts its own throwaway PostgreSQL container, so tests do not
//! share tables. Docker must be running.

#![allow(dead_code)]

use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use std::io::Write;
use std::path::{Path, PathBuf};
use tabload::DbConfig;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

/// PostgreSQL image tag used by the tests
pub const POSTGRES_TAG: &str = "16-alpine";

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    config: DbConfig,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag(POSTGRES_TAG)
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let config = DbConfig {
            host: host.to_string(),
            port,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: Some("postgres".to_string()),
            ..Default::default()
        };

        Ok(Self {
            _container: container,
            config,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub async fn connect(&self) -> Result<PgConnection> {
        let options = self.config.to_connect_options()?;
        PgConnection::connect_with(&options)
            .await
            .context("Failed to connect to PostgreSQL")
    }
}

pub async fn row_count(conn: &mut PgConnection, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// `(column_name, data_type, character_maximum_length)` in column order
pub async fn table_columns(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Vec<(String, String, Option<i32>)>> {
    let columns = sqlx::query_as(
        r#"
        SELECT column_name::text, data_type::text, character_maximum_length::int
        FROM information_schema.columns
        WHERE table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;
    Ok(columns)
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create CSV fixture");
    file.write_all(contents.as_bytes())
        .expect("Failed to write CSV fixture");
    path
}

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,tabload=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
