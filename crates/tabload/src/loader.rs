//! Per-file load pipeline
//!
//! read → normalize dates → build table spec → create table if missing →
//! insert in one transaction. A run feeds every manifest entry through this
//! pipeline in order and keeps going when one of them fails.

use crate::batch::RowBatch;
use crate::config::DbConfig;
use crate::db;
use crate::error::{LoadError, Result};
use crate::manifest::{Manifest, TableSource};
use crate::normalize::normalize_timestamps;
use crate::reader::read_batch;
use crate::schema::TableSpec;
use sqlx::{Connection, PgConnection};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Where one source got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    NotStarted,
    Read,
    Normalized,
    TableExists,
    TableCreated,
    Inserted,
    Failed,
}

impl LoadStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadStage::Inserted | LoadStage::Failed)
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadStage::NotStarted => "not_started",
            LoadStage::Read => "read",
            LoadStage::Normalized => "normalized",
            LoadStage::TableExists => "table_exists",
            LoadStage::TableCreated => "table_created",
            LoadStage::Inserted => "inserted",
            LoadStage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Tracks and logs stage transitions for one source.
struct StageTracker<'a> {
    table: &'a str,
    stage: LoadStage,
}

impl<'a> StageTracker<'a> {
    fn new(table: &'a str) -> Self {
        Self {
            table,
            stage: LoadStage::NotStarted,
        }
    }

    fn advance(&mut self, next: LoadStage) {
        debug!(table = self.table, from = %self.stage, to = %next, "Stage transition");
        self.stage = next;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows_inserted: usize,
    pub table_created: bool,
}

#[derive(Debug)]
pub struct SourceOutcome {
    pub table: String,
    pub stage: LoadStage,
    pub result: Result<LoadReport>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &LoadReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &LoadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.table.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn rows_inserted(&self) -> usize {
        self.succeeded().map(|r| r.rows_inserted).sum()
    }
}

pub struct TableLoader;

impl TableLoader {
    /// Read, normalize and describe one source without touching a database.
    pub fn plan(source: &TableSource) -> Result<TableSpec> {
        Self::prepare(source, &mut StageTracker::new(&source.table)).map(|(spec, _)| spec)
    }

    fn prepare(
        source: &TableSource,
        tracker: &mut StageTracker<'_>,
    ) -> Result<(TableSpec, RowBatch)> {
        let mut batch = read_batch(&source.file, &source.read_options()?)?;
        tracker.advance(LoadStage::Read);

        normalize_timestamps(&mut batch);
        tracker.advance(LoadStage::Normalized);

        let spec = TableSpec::from_batch(
            &source.table,
            &batch,
            source.primary_key.as_deref(),
            &source.foreign_keys,
        )?;

        Ok((spec, batch))
    }

    /// Load one source into its table.
    #[instrument(skip_all, fields(table = %source.table, file = %source.file.display()))]
    pub async fn load(conn: &mut PgConnection, source: &TableSource) -> Result<LoadReport> {
        let mut tracker = StageTracker::new(&source.table);
        let result = Self::load_tracked(conn, source, &mut tracker).await;
        if result.is_err() {
            tracker.advance(LoadStage::Failed);
        }
        result
    }

    async fn load_tracked(
        conn: &mut PgConnection,
        source: &TableSource,
        tracker: &mut StageTracker<'_>,
    ) -> Result<LoadReport> {
        let (spec, batch) = Self::prepare(source, tracker)?;

        let table_created = if db::table_exists(conn, spec.name.as_str()).await? {
            tracker.advance(LoadStage::TableExists);
            false
        } else {
            db::create_table(conn, &spec).await?;
            tracker.advance(LoadStage::TableCreated);
            true
        };

        let rows_inserted = db::insert_batch(conn, &spec, &batch).await?;
        tracker.advance(LoadStage::Inserted);

        Ok(LoadReport {
            table: source.table.clone(),
            rows_inserted,
            table_created,
        })
    }

    /// Load every source in order, recording failures instead of stopping.
    pub async fn run(conn: &mut PgConnection, sources: &[TableSource]) -> RunReport {
        let mut report = RunReport::default();

        for source in sources {
            let started = Instant::now();
            let result = Self::load(conn, source).await;

            let stage = match &result {
                Ok(loaded) => {
                    info!(
                        table = %loaded.table,
                        rows = loaded.rows_inserted,
                        created = loaded.table_created,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Loaded table"
                    );
                    LoadStage::Inserted
                },
                Err(e) => {
                    error!(table = %source.table, kind = e.kind(), error = %e, "Failed to load table");
                    LoadStage::Failed
                },
            };

            report.outcomes.push(SourceOutcome {
                table: source.table.clone(),
                stage,
                result,
            });
        }

        report
    }

    /// Connect, run the whole manifest, then close the connection.
    pub async fn run_manifest(config: &DbConfig, manifest: &Manifest) -> Result<RunReport> {
        let mut conn = db::connect(config).await?;
        info!(tables = manifest.tables.len(), "Starting load run");

        let report = Self::run(&mut conn, &manifest.tables).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection");
        }

        let failed = report.failed().count();
        info!(
            loaded = report.outcomes.len() - failed,
            failed,
            rows = report.rows_inserted(),
            "Load run finished"
        );

        Ok(report)
    }
}
