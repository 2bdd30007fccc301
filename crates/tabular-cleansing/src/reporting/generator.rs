use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::summary::CleansingReport;
use crate::config::CleansingConfig;
use crate::error::{CleansingError, Result};
use crate::io::write_csv;
use crate::types::Table;

/// A cleansing report stamped with run metadata, as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub input_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_file: Option<String>,
    #[serde(flatten)]
    pub report: CleansingReport,
}

/// Writes reports and cleaned datasets to an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: String,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::from_config(&CleansingConfig::default())
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, output_name: impl Into<String>) -> Self {
        Self {
            output_dir,
            output_name: output_name.into(),
        }
    }

    pub fn from_config(config: &CleansingConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_stem())
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Path the cleaned CSV is written to.
    pub fn dataset_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.output_name))
    }

    /// Path the JSON report is written to.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_report.json", self.output_name))
    }

    /// Stamp a report with the current time and file locations.
    pub fn build_report(
        input_file: Option<&str>,
        output_file: Option<&str>,
        report: &CleansingReport,
    ) -> GeneratedReport {
        GeneratedReport {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.map(str::to_string),
            output_file: output_file.map(str::to_string),
            report: report.clone(),
        }
    }

    /// Write the cleaned table as `<name>.csv`.
    pub fn write_dataset(&self, table: &Table) -> Result<PathBuf> {
        write_csv(table, self.dataset_path())
            .map_err(|e| CleansingError::ReportGenerationFailed(e.to_string()))
    }

    /// Write a report as pretty JSON to `<name>_report.json`.
    pub fn write_report_to_file(&self, report: &GeneratedReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.report_path();
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Write both the cleaned dataset and its report.
    ///
    /// Returns `(dataset_path, report_path)`.
    pub fn generate_files(
        &self,
        input_file: Option<&str>,
        table: &Table,
        report: &CleansingReport,
    ) -> Result<(PathBuf, PathBuf)> {
        let dataset_path = self.write_dataset(table)?;
        let dataset = dataset_path.to_string_lossy().to_string();
        let generated = Self::build_report(input_file, Some(&dataset), report);
        let report_path = self.write_report_to_file(&generated)?;
        Ok((dataset_path, report_path))
    }
}
