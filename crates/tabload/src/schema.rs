//! Table specifications and the DDL built from them
//!
//! Identifiers cannot be bound as statement parameters, so every table and
//! column name that reaches SQL text goes through [`Identifier`]: validated
//! once, then rendered the way PostgreSQL's `quote_ident` would, bare when
//! that is unambiguous and double-quoted otherwise.

use crate::batch::RowBatch;
use crate::error::{LoadError, Result};
use crate::infer::{infer_column_type, SqlType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// PostgreSQL truncates longer names (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_BYTES: usize = 63;

/// Keywords that cannot appear bare as a table or column name.
///
/// Reserved, column-name and type/function-name keywords; sorted for
/// binary search.
const KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "bigint", "binary", "bit", "boolean", "both", "case", "cast",
    "char", "character", "check", "coalesce", "collate", "collation", "column", "concurrently",
    "constraint", "create", "cross", "current_catalog", "current_date", "current_role",
    "current_schema", "current_time", "current_timestamp", "current_user", "dec", "decimal",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "exists",
    "extract", "false", "fetch", "float", "for", "foreign", "freeze", "from", "full", "grant",
    "greatest", "group", "grouping", "having", "ilike", "in", "initially", "inner", "inout",
    "int", "integer", "intersect", "interval", "into", "is", "isnull", "join", "lateral",
    "leading", "least", "left", "like", "limit", "localtime", "localtimestamp", "national",
    "natural", "nchar", "none", "normalize", "not", "notnull", "null", "nullif", "numeric",
    "offset", "on", "only", "or", "order", "out", "outer", "overlaps", "overlay", "placing",
    "position", "precision", "primary", "real", "references", "returning", "right", "row",
    "select", "session_user", "setof", "similar", "smallint", "some", "substring", "symmetric",
    "system_user", "table", "tablesample", "then", "time", "timestamp", "to", "trailing",
    "treat", "trim", "true", "union", "unique", "user", "using", "values", "varchar",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// A validated table or column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(LoadError::Identifier("identifier is empty".to_string()));
        }
        if name.len() > MAX_IDENTIFIER_BYTES {
            return Err(LoadError::Identifier(format!(
                "'{}' is {} bytes long, the limit is {}",
                name,
                name.len(),
                MAX_IDENTIFIER_BYTES
            )));
        }
        if name.contains('\0') {
            return Err(LoadError::Identifier(format!(
                "'{}' contains a NUL character",
                name.escape_debug()
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn needs_quotes(&self) -> bool {
        let mut chars = self.0.chars();
        let simple = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
        !simple || KEYWORDS.binary_search(&self.0.as_str()).is_ok()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.needs_quotes() {
            write!(f, "\"{}\"", self.0.replace('"', "\"\""))
        } else {
            f.write_str(&self.0)
        }
    }
}

/// A column referenced by a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub column: String,
}

/// Local column plus every column it references, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// Name and inferred type of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: Identifier,
    pub sql_type: SqlType,
}

/// One `FOREIGN KEY (column) REFERENCES table(ref_column)` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyClause {
    pub column: Identifier,
    pub table: Identifier,
    pub ref_column: Identifier,
}

/// Everything needed to create the table for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: Identifier,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Option<Identifier>,
    pub foreign_keys: Vec<ForeignKeyClause>,
}

impl TableSpec {
    /// Infer a spec from `batch`, keeping its column order.
    ///
    /// The primary key and every local foreign-key column must be columns of
    /// the batch.
    pub fn from_batch(
        table: &str,
        batch: &RowBatch,
        primary_key: Option<&str>,
        foreign_keys: &[ForeignKey],
    ) -> Result<Self> {
        let name = Identifier::new(table)?;

        let columns = batch
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                Ok(ColumnDescriptor {
                    name: Identifier::new(column.as_str())?,
                    sql_type: infer_column_type(batch.column(idx)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let known = |column: &str, role: &str| -> Result<Identifier> {
            if batch.column_index(column).is_none() {
                return Err(LoadError::Schema(format!(
                    "{} column '{}' is not a column of table '{}'",
                    role, column, table
                )));
            }
            Identifier::new(column)
        };

        let primary_key = primary_key
            .map(|pk| known(pk, "primary key"))
            .transpose()?;

        let mut clauses = Vec::new();
        for fk in foreign_keys {
            let column = known(&fk.column, "foreign key")?;
            for reference in &fk.references {
                clauses.push(ForeignKeyClause {
                    column: column.clone(),
                    table: Identifier::new(reference.table.as_str())?,
                    ref_column: Identifier::new(reference.column.as_str())?,
                });
            }
        }

        Ok(Self {
            name,
            columns,
            primary_key,
            foreign_keys: clauses,
        })
    }

    pub fn column_names(&self) -> Vec<Identifier> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `CREATE TABLE name (col type, ..., PRIMARY KEY (..), FOREIGN KEY (..) REFERENCES ..(..))`
    pub fn create_table_sql(&self) -> String {
        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect();

        if let Some(ref pk) = self.primary_key {
            clauses.push(format!("PRIMARY KEY ({})", pk));
        }

        for fk in &self.foreign_keys {
            clauses.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.table, fk.ref_column
            ));
        }

        format!("CREATE TABLE {} ({})", self.name, clauses.join(", "))
    }
}

/// `INSERT INTO table (c1, c2) ` ready for a VALUES list
pub fn insert_prefix(table: &Identifier, columns: &[Identifier]) -> String {
    let columns: Vec<String> = columns.iter().map(ToString::to_string).collect();
    format!("INSERT INTO {} ({}) ", table, columns.join(", "))
}
