//! tabload
//!
//! Loads delimited text files into PostgreSQL. For every file listed in a run
//! manifest, tabload reads the rows, infers a column type for each column,
//! creates the target table when it does not exist yet (with the declared
//! primary and foreign keys), and bulk-inserts all rows in one transaction.
//!
//! # Modules
//!
//! - [`reader`]: delimited file to [`RowBatch`]
//! - [`normalize`]: date-string columns to timestamps
//! - [`infer`]: column values to [`SqlType`]
//! - [`schema`]: identifiers, table specs and DDL text
//! - [`db`]: existence check, `CREATE TABLE`, bulk insert
//! - [`loader`]: per-file pipeline and the run over a manifest
//! - [`manifest`], [`config`]: what to load and where
//!
//! # Example
//!
//! ```no_run
//! use tabload::{DbConfig, Manifest, TableLoader};
//!
//! # async fn example() -> tabload::Result<()> {
//! let manifest = Manifest::load("tables.yml")?;
//! let config = DbConfig::from_env()?;
//!
//! let report = TableLoader::run_manifest(&config, &manifest).await?;
//! for (table, error) in report.failed() {
//!     eprintln!("{}: {}", table, error);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod config;
pub mod db;
pub mod error;
pub mod infer;
pub mod loader;
pub mod manifest;
pub mod normalize;
pub mod reader;
pub mod schema;

pub use batch::{RowBatch, Value};
pub use config::DbConfig;
pub use error::{LoadError, Result};
pub use infer::{infer_column_type, SqlType};
pub use loader::{LoadReport, LoadStage, RunReport, TableLoader};
pub use manifest::{Manifest, TableSource};
pub use reader::{read_batch, ReadOptions};
pub use schema::{ColumnDescriptor, ForeignKey, Identifier, Reference, TableSpec};
