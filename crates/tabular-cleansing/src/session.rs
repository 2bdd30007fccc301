//! Explicit session state for interactive use.
//!
//! A [`Session`] owns what an interactive front end needs between calls:
//!
//! ```text
//! ┌──────────────────────── Session ────────────────────────┐
//! │  raw: RwLock<Option<LoadedTable>>   (last loaded CSV)   │
//! │  cleaned: RwLock<Option<CleansingResult>>               │
//! │  history: RwLock<Vec<HistoryEntry>> (newest first)      │
//! │  token: RwLock<CancellationToken>                       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All state sits behind `parking_lot::RwLock`, so a `Session` can be shared
//! across threads by reference or in an `Arc`. Locks are never held while
//! the pipeline runs.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CleansingConfig;
use crate::encoder::CategoricalEncoder;
use crate::error::{CleansingError, Result};
use crate::io;
use crate::pipeline::{CancellationToken, CleansingResult, Pipeline, ProgressReporter};
use crate::profiler::ColumnClassifier;
use crate::reporting::{CleansingReport, ReportGenerator};
use crate::types::{RawTable, Table};

/// Maximum number of history entries to keep.
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// A raw table together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub raw: RawTable,
    /// File path, if loaded from disk.
    pub source: Option<PathBuf>,
}

/// One completed cleansing run.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Unix timestamp (seconds) of completion.
    pub timestamp: i64,
    pub config: CleansingConfig,
    pub report: CleansingReport,
    /// `(dataset, report)` paths when the run was saved to disk.
    pub outputs: Option<(PathBuf, PathBuf)>,
}

/// Holds the loaded table, the last cleaned result, and run history.
pub struct Session {
    raw: RwLock<Option<LoadedTable>>,
    cleaned: RwLock<Option<CleansingResult>>,
    config: RwLock<Option<CleansingConfig>>,
    history: RwLock<Vec<HistoryEntry>>,
    token: RwLock<CancellationToken>,
    progress_reporter: RwLock<Option<Arc<dyn ProgressReporter>>>,
}

static_assertions::assert_impl_all!(Session: Send, Sync);

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            raw: RwLock::new(None),
            cleaned: RwLock::new(None),
            config: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            token: RwLock::new(CancellationToken::new()),
            progress_reporter: RwLock::new(None),
        }
    }

    /// Parse CSV text and make it the current table.
    ///
    /// Clears any previous cleaned result. Returns `(rows, columns)`.
    pub fn load_csv(&self, text: &str, has_header: bool) -> Result<(usize, usize)> {
        let raw = io::read_csv_str(text, has_header)?;
        Ok(self.store_raw(raw, None))
    }

    /// Read a CSV file and make it the current table.
    pub fn load_file(&self, path: impl AsRef<Path>, has_header: bool) -> Result<(usize, usize)> {
        let path = path.as_ref();
        let raw = io::read_csv_file(path, has_header)?;
        Ok(self.store_raw(raw, Some(path.to_path_buf())))
    }

    /// Make an already parsed table the current one.
    pub fn load_raw(&self, raw: RawTable) -> (usize, usize) {
        self.store_raw(raw, None)
    }

    fn store_raw(&self, raw: RawTable, source: Option<PathBuf>) -> (usize, usize) {
        let shape = (raw.height(), raw.width());
        info!("Session loaded table: {} rows, {} columns", shape.0, shape.1);
        *self.raw.write() = Some(LoadedTable { raw, source });
        *self.cleaned.write() = None;
        *self.config.write() = None;
        shape
    }

    pub fn has_data(&self) -> bool {
        self.raw.read().is_some()
    }

    /// Forward progress of subsequent runs to `reporter`.
    pub fn set_progress_reporter(&self, reporter: Option<Arc<dyn ProgressReporter>>) {
        *self.progress_reporter.write() = reporter;
    }

    /// Token of the current run; cancel it to stop [`clean`](Self::clean).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.read().clone()
    }

    /// Request cancellation of the running clean.
    pub fn cancel(&self) {
        self.token.read().cancel();
    }

    /// Clean the loaded table with `config`.
    ///
    /// On success the result replaces the previous one and a history entry is
    /// added. When `config.save_to_disk` is set, the cleaned CSV and the
    /// report are written through [`ReportGenerator`].
    ///
    /// # Errors
    ///
    /// [`CleansingError::NoDataLoaded`] if nothing was loaded, plus any
    /// pipeline error. A failed or cancelled run leaves the previous result
    /// in place.
    pub fn clean(&self, config: CleansingConfig) -> Result<CleansingReport> {
        let loaded = self.raw.read().clone().ok_or(CleansingError::NoDataLoaded)?;

        let token = {
            let token = self.token.read().clone();
            token.reset();
            token
        };

        let mut builder = Pipeline::builder()
            .config(config.clone())
            .cancellation_token(token);
        if let Some(reporter) = self.progress_reporter.read().clone() {
            builder = builder.progress_reporter(reporter);
        }
        let result = builder.build()?.process(loaded.raw)?;

        let outputs = if config.save_to_disk {
            let source = loaded.source.as_ref().map(|p| p.to_string_lossy().to_string());
            let generator = ReportGenerator::from_config(&config);
            Some(generator.generate_files(source.as_deref(), &result.table, &result.report)?)
        } else {
            None
        };

        let report = result.report.clone();
        let entry = HistoryEntry {
            timestamp: chrono::Local::now().timestamp(),
            config: config.clone(),
            report: report.clone(),
            outputs,
        };

        *self.cleaned.write() = Some(result);
        *self.config.write() = Some(config);

        let mut history = self.history.write();
        history.insert(0, entry);
        if history.len() > MAX_HISTORY_ENTRIES {
            history.truncate(MAX_HISTORY_ENTRIES);
        }

        Ok(report)
    }

    /// Report of the last successful run.
    pub fn report(&self) -> Option<CleansingReport> {
        self.cleaned.read().as_ref().map(|r| r.report.clone())
    }

    /// Cleaned table of the last successful run.
    pub fn cleaned_table(&self) -> Option<Table> {
        self.cleaned.read().as_ref().map(|r| r.table.clone())
    }

    /// Label values of the last successful run.
    pub fn labels(&self) -> Option<Vec<Option<f64>>> {
        self.cleaned.read().as_ref().map(CleansingResult::labels)
    }

    /// History of runs, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.read().clone()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Encode `table` with the mappings of the last run, for display.
    ///
    /// Columns whose mapping was built from different data are passed
    /// through as text; their names are returned with the encoded copy.
    pub fn display_encoded(&self, table: &Table) -> Result<(Table, Vec<String>)> {
        let cleaned = self.cleaned.read();
        let result = cleaned.as_ref().ok_or(CleansingError::NoDataLoaded)?;

        let mut encoded = table.clone();
        let passed_through = CategoricalEncoder::apply(&mut encoded, result.mappings());
        debug!(
            "Applied {} mapping(s), {} passed through",
            result.mappings().len(),
            passed_through.len()
        );
        Ok((encoded, passed_through))
    }

    /// Classify the loaded table with the last run's configuration and
    /// encode it for display.
    pub fn display_loaded(&self) -> Result<(Table, Vec<String>)> {
        let config = self.config.read().clone().ok_or(CleansingError::NoDataLoaded)?;
        let loaded = self.raw.read().clone().ok_or(CleansingError::NoDataLoaded)?;
        let classification = ColumnClassifier::classify(&loaded.raw, &config)?;
        self.display_encoded(&classification.table)
    }

    /// Drop the loaded table, the cleaned result and the history.
    pub fn reset(&self) {
        *self.raw.write() = None;
        *self.cleaned.write() = None;
        *self.config.write() = None;
        self.history.write().clear();
        self.token.read().reset();
        info!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutlierPolicy;
    use crate::pipeline::{PipelineStage, ProgressUpdate};
    use crate::types::{Cell, ColumnKind, ColumnSpec};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const CSV: &str = "x,color,y\n1,red,0\n2,blue,1\n3,red,0\n";

    #[test]
    fn test_clean_without_data() {
        let session = Session::new();
        let err = session.clean(CleansingConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "NO_DATA_LOADED");
        assert!(session.report().is_none());
    }

    #[test]
    fn test_load_and_clean() {
        let session = Session::new();
        assert_eq!(session.load_csv(CSV, true).unwrap(), (3, 3));

        let report = session.clean(CleansingConfig::default()).unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(session.report(), Some(report));
        assert_eq!(session.cleaned_table().map(|t| t.height()), Some(3));
        assert_eq!(session.labels(), Some(vec![Some(0.0), Some(1.0), Some(0.0)]));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_reload_clears_result() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        session.clean(CleansingConfig::default()).unwrap();

        session.load_csv("a,b\n1,2\n", true).unwrap();
        assert!(session.report().is_none());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        for _ in 0..MAX_HISTORY_ENTRIES + 3 {
            session.clean(CleansingConfig::default()).unwrap();
        }
        assert_eq!(session.history().len(), MAX_HISTORY_ENTRIES);
    }

    #[test]
    fn test_display_loaded_uses_mappings() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        session.clean(CleansingConfig::default()).unwrap();

        let (table, passed_through) = session.display_loaded().unwrap();
        assert!(passed_through.is_empty());
        let colors: Vec<&Cell> = table.column_cells(1).collect();
        assert_eq!(
            colors,
            vec![&Cell::Number(0.0), &Cell::Number(1.0), &Cell::Number(0.0)]
        );
    }

    #[test]
    fn test_display_loaded_after_row_drops_still_encodes() {
        let session = Session::new();
        session
            .load_csv(
                "x,color,y\n1,red,0\n2,blue,1\n3,red,0\n4,green,1\n1000,blue,0\n,red,1\n",
                true,
            )
            .unwrap();
        let config = CleansingConfig::builder()
            .outlier_policy(OutlierPolicy::Drop)
            .missing_values(crate::config::MissingValueStrategy::DropRows)
            .build()
            .unwrap();
        let report = session.clean(config).unwrap();
        assert_eq!(report.samples, 4);

        let (table, passed_through) = session.display_loaded().unwrap();
        assert!(passed_through.is_empty());
        assert_eq!(table.height(), 6);
        assert_eq!(
            table.numeric_values(1),
            vec![0.0, 1.0, 0.0, 2.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_display_foreign_table_passes_through() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        session.clean(CleansingConfig::default()).unwrap();

        let other = Table::new(
            vec![
                ColumnSpec::new("color", ColumnKind::Categorical),
                ColumnSpec::new("y", ColumnKind::Label),
            ],
            vec![vec![Cell::Text("green".into()), Cell::Number(1.0)]],
        )
        .unwrap();
        let (table, passed_through) = session.display_encoded(&other).unwrap();
        assert_eq!(passed_through, vec!["color".to_string()]);
        assert_eq!(table.cell(0, 0), &Cell::Text("green".into()));
    }

    #[test]
    fn test_failed_run_keeps_previous_result() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        let first = session.clean(CleansingConfig::default()).unwrap();

        let bad = CleansingConfig::builder().label_column("missing").build().unwrap();
        assert!(session.clean(bad).is_err());
        assert_eq!(session.report(), Some(first));
    }

    #[test]
    fn test_cancel_from_progress_callback() {
        let session = Arc::new(Session::new());
        session.load_csv(CSV, true).unwrap();

        let handle = session.clone();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        session.set_progress_reporter(Some(Arc::new(
            crate::pipeline::ClosureProgressReporter::new(move |update: ProgressUpdate| {
                if update.stage == PipelineStage::OutlierResolution {
                    handle.cancel();
                }
                sink.lock().push(update.stage);
            }),
        )));

        let err = session.clean(CleansingConfig::default()).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(stages.lock().last(), Some(&PipelineStage::Cancelled));
        assert!(session.report().is_none());

        // The next run starts with a fresh flag.
        session.set_progress_reporter(None);
        assert!(session.clean(CleansingConfig::default()).is_ok());
    }

    #[test]
    fn test_save_to_disk_records_outputs() {
        let dir = std::env::temp_dir().join(format!("tc_session_{}", std::process::id()));
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();

        let config = CleansingConfig::builder()
            .outlier_policy(OutlierPolicy::Drop)
            .output_dir(&dir)
            .output_name("session_run")
            .save_to_disk(true)
            .build()
            .unwrap();
        session.clean(config).unwrap();

        let history = session.history();
        let (csv, json) = history[0].outputs.clone().unwrap();
        assert!(csv.exists());
        assert!(json.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reset() {
        let session = Session::new();
        session.load_csv(CSV, true).unwrap();
        session.clean(CleansingConfig::default()).unwrap();
        session.reset();
        assert!(!session.has_data());
        assert!(session.report().is_none());
        assert!(session.history().is_empty());
    }
}
