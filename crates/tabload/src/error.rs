//! Error types for tabload
//!
//! Every failure a single source can hit maps onto one variant here. The
//! loader decides per variant whether the run continues (see
//! [`crate::loader::TableLoader::run`]); the messages are written for the
//! operator reading the run log.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for tabload operations
pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    /// Input file is missing; the source is skipped
    #[error("File not found: '{}'", .0.display())]
    FileNotFound(PathBuf),

    /// Input file could not be parsed as delimited text
    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Table or column name cannot be used as a SQL identifier
    #[error("Invalid identifier: {0}")]
    Identifier(String),

    /// Declared key metadata does not fit the file's columns
    #[error("Schema error: {0}")]
    Schema(String),

    /// Connection or catalog query failed
    #[error("Database error: {0}. Check the connection settings.")]
    Database(#[from] sqlx::Error),

    /// CREATE TABLE failed
    #[error("Failed to create table '{table}': {source}")]
    Ddl {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Bulk insert failed and was rolled back
    #[error("Insert into '{table}' failed and was rolled back: {source}")]
    Insert {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Run manifest is missing or malformed
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Connection settings are missing or invalid
    #[error("Configuration error: {0}. Check DATABASE_URL or the TABLOAD_DB_* variables.")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn ddl(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Ddl {
            table: table.into(),
            source,
        }
    }

    pub fn insert(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Insert {
            table: table.into(),
            source,
        }
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Short machine-friendly name, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::FileNotFound(_) => "file_not_found",
            LoadError::Parse { .. } => "parse",
            LoadError::Identifier(_) => "identifier",
            LoadError::Schema(_) => "schema",
            LoadError::Database(_) => "database",
            LoadError::Ddl { .. } => "ddl",
            LoadError::Insert { .. } => "insert",
            LoadError::Manifest(_) => "manifest",
            LoadError::Config(_) => "config",
            LoadError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = LoadError::FileNotFound(PathBuf::from("data/t_cities.csv"));
        assert_eq!(err.to_string(), "File not found: 'data/t_cities.csv'");

        let err = LoadError::parse(Path::new("sales.csv"), "row 3 has 2 fields, expected 4");
        assert!(err.to_string().contains("sales.csv"));
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_insert_error_keeps_source() {
        let err = LoadError::insert("sales", sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), "insert");
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("rolled back"));
    }
}
