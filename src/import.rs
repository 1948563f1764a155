use serde::Serialize;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::mapping::FieldMapping;
use crate::payload::{LeadPayload, DEFAULT_SOURCE};
use crate::remote::RecordCreator;
use crate::tokenizer::RawRow;
use crate::validate::{ValidationError, ValidationSummary};

/// Field name used for errors raised while creating a record.
pub const RECORD_FIELD: &str = "registro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Imported,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub row: usize,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Result of an ingestion session, addressable by source line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub imported: usize,
    pub failed: usize,
    /// Set when the progress callback stopped the run with rows left.
    pub cancelled: bool,
    pub errors: Vec<ValidationError>,
    /// Advisory notes carried over from validation.
    pub warnings: Vec<String>,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportSummary {
    /// Seed a summary with the counts and errors of the validation pass.
    pub fn from_validation(validation: &ValidationSummary) -> Self {
        Self {
            total: validation.total,
            valid: validation.valid_count,
            invalid: validation.invalid_count,
            duplicates: validation.duplicate_count,
            errors: validation.errors.clone(),
            warnings: validation.warnings.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Pause between two creation calls.
    pub row_delay: Duration,
    /// `source` written when the row has none.
    pub default_source: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            row_delay: Duration::from_millis(100),
            default_source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl ImportOptions {
    pub fn with_row_delay(mut self, row_delay: Duration) -> Self {
        self.row_delay = row_delay;
        self
    }

    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }
}

/// Submits valid rows one at a time, in order.
pub struct Importer {
    options: ImportOptions,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub async fn run<F>(
        &self,
        rows: &[&RawRow],
        mapping: &FieldMapping,
        creator: &dyn RecordCreator,
        on_progress: F,
    ) -> ImportSummary
    where
        F: FnMut(ImportProgress) -> ControlFlow<()>,
    {
        let mut summary = ImportSummary {
            total: rows.len(),
            valid: rows.len(),
            ..Default::default()
        };
        self.run_into(&mut summary, rows, mapping, creator, on_progress)
            .await;
        summary
    }

    /// Like [`Importer::run`], appending to a caller-owned summary so it
    /// reflects every row handled so far even if the future is dropped.
    ///
    /// `on_progress` fires after each row; returning `Break` stops before the
    /// next one. Rows already submitted stay submitted.
    pub async fn run_into<F>(
        &self,
        summary: &mut ImportSummary,
        rows: &[&RawRow],
        mapping: &FieldMapping,
        creator: &dyn RecordCreator,
        mut on_progress: F,
    ) where
        F: FnMut(ImportProgress) -> ControlFlow<()>,
    {
        let total = rows.len();
        info!(rows = total, delay_ms = self.options.row_delay.as_millis() as u64, "starting import");

        for (i, row) in rows.iter().enumerate() {
            if i > 0 && !self.options.row_delay.is_zero() {
                tokio::time::sleep(self.options.row_delay).await;
            }

            let payload = LeadPayload::from_row(row, mapping, &self.options.default_source);
            match creator.create_record(&payload).await {
                Ok(()) => {
                    debug!(row = row.line, "lead created");
                    summary.imported += 1;
                    summary.outcomes.push(ImportOutcome {
                        row: row.line,
                        status: ImportStatus::Imported,
                        error_message: None,
                    });
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(row = row.line, error = %message, "lead creation failed");
                    summary.failed += 1;
                    let value = payload.email.clone().unwrap_or_else(|| payload.name.clone());
                    summary.errors.push(ValidationError::new(
                        row.line,
                        RECORD_FIELD,
                        message.clone(),
                        value,
                    ));
                    summary.outcomes.push(ImportOutcome {
                        row: row.line,
                        status: ImportStatus::Failed,
                        error_message: Some(message),
                    });
                }
            }

            let progress = ImportProgress {
                processed: i + 1,
                total,
            };
            if on_progress(progress).is_break() {
                summary.cancelled = progress.processed < total;
                if summary.cancelled {
                    info!(processed = progress.processed, total, "import cancelled");
                }
                break;
            }
        }

        info!(
            imported = summary.imported,
            failed = summary.failed,
            "import finished"
        );
    }
}
