//! Run manifest (YAML)
//!
//! Lists the files of one run, in load order, with the table each goes into
//! and its key metadata. Tables that others reference must come first.
//!
//! ```yaml
//! tables:
//!   - file: data/t_cities.csv
//!     table: cities
//!     primary_key: Ссылка
//!   - file: data/t_branches.csv
//!     table: branches
//!     primary_key: Ссылка
//!     foreign_keys:
//!       - column: Город
//!         references:
//!           - { table: cities, column: Ссылка }
//! ```

use crate::error::{LoadError, Result};
use crate::reader::ReadOptions;
use crate::schema::ForeignKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub tables: Vec<TableSource>,
}

/// One file and the table it is loaded into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    pub file: PathBuf,

    pub table: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,

    /// Single-byte field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// The first column is an exported row index and is dropped
    #[serde(default = "default_index_column")]
    pub index_column: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_index_column() -> bool {
    true
}

impl TableSource {
    pub fn new(file: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            table: table.into(),
            primary_key: None,
            foreign_keys: Vec::new(),
            delimiter: default_delimiter(),
            index_column: default_index_column(),
        }
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn without_index_column(mut self) -> Self {
        self.index_column = false;
        self
    }

    pub fn read_options(&self) -> Result<ReadOptions> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                LoadError::manifest(format!(
                    "delimiter {:?} for table '{}' is not a single ASCII character",
                    self.delimiter, self.table
                ))
            })?;

        Ok(ReadOptions {
            delimiter,
            index_column: self.index_column,
        })
    }
}

impl Manifest {
    /// Load a manifest; relative `file` paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let mut manifest = Self::from_yaml(&content)?;

        if let Some(base) = path.parent() {
            for source in &mut manifest.tables {
                if source.file.is_relative() {
                    source.file = base.join(&source.file);
                }
            }
        }

        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|e| LoadError::manifest(format!("failed to parse YAML: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(LoadError::manifest("no tables listed"));
        }

        for source in &self.tables {
            if source.table.trim().is_empty() {
                return Err(LoadError::manifest(format!(
                    "entry for '{}' has an empty table name",
                    source.file.display()
                )));
            }
            source.read_options()?;
        }

        Ok(())
    }
}
