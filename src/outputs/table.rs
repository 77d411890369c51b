//! Accumulation and CSV serialization of article records.
//!
//! The output table has a fixed four-column schema (see
//! [`ColumnSchema`]). A fresh run overwrites the file; a resumed run appends
//! rows and only writes the header if the file is new or empty, so the column
//! order stays identical across every flush of a profile. During a run,
//! [`TableWriter`] appends each completed page before the checkpoint moves.

use crate::error::{CollectError, Result};
use crate::models::{ArticleRecord, ColumnSchema};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    Overwrite,
    Append,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FlushReport {
    /// No records were collected; no file was touched.
    NothingToSave,
    Written { path: PathBuf, rows: usize },
}

/// Counts of records that carry fallback data.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QualitySummary {
    pub date_fallbacks: usize,
    pub degraded: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<ArticleRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ArticleRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ArticleRecord>) {
        for record in records {
            self.append(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    pub fn quality(&self) -> QualitySummary {
        QualitySummary {
            date_fallbacks: self.records.iter().filter(|r| r.published.is_fallback()).count(),
            degraded: self.records.iter().filter(|r| r.degraded).count(),
        }
    }

    /// Write every accumulated record to `path` as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    #[instrument(level = "info", skip(self), fields(path = %path.display(), records = self.records.len()))]
    pub async fn flush_to_table(
        &self,
        path: &Path,
        schema: ColumnSchema,
        mode: FlushMode,
    ) -> Result<FlushReport> {
        if self.is_empty() {
            warn!("No data to save. Check your selectors and extracted content.");
            return Ok(FlushReport::NothingToSave);
        }

        write_rows(path, schema, mode, &self.records).await?;
        info!(rows = self.records.len(), ?mode, "Data saved");
        Ok(FlushReport::Written {
            path: path.to_path_buf(),
            rows: self.records.len(),
        })
    }
}

/// Writes a run's records to the output table as each page completes.
///
/// The first non-empty batch is written with the run's [`FlushMode`]; every
/// later batch is appended, so a fresh run truncates the table exactly once.
#[derive(Debug)]
pub struct TableWriter {
    path: PathBuf,
    schema: ColumnSchema,
    mode: FlushMode,
    rows_written: usize,
}

impl TableWriter {
    pub fn new(path: impl Into<PathBuf>, schema: ColumnSchema, mode: FlushMode) -> Self {
        Self {
            path: path.into(),
            schema,
            mode,
            rows_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Durably write `records`. An empty batch touches nothing.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), rows = records.len()))]
    pub async fn write_batch(&mut self, records: &[ArticleRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        write_rows(&self.path, self.schema, self.mode, records).await?;
        self.mode = FlushMode::Append;
        self.rows_written += records.len();
        debug!(total = self.rows_written, "Rows written");
        Ok(())
    }
}

async fn write_rows(
    path: &Path,
    schema: ColumnSchema,
    mode: FlushMode,
    records: &[ArticleRecord],
) -> Result<()> {
    let needs_header = match mode {
        FlushMode::Overwrite => true,
        FlushMode::Append => match fs::metadata(path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        },
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    if needs_header {
        writer.write_record(schema.headers())?;
    }
    for record in records {
        writer.write_record(record.row())?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CollectError::Io(e.into_error()))?;

    match mode {
        FlushMode::Overwrite => fs::write(path, &bytes).await?,
        FlushMode::Append => {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(&bytes).await?;
            file.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateValue, FallbackReason};
    use chrono::NaiveDate;

    fn record(title: &str, degraded: bool) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            body_text: "Body, with \"quotes\"".to_string(),
            subject: "World".to_string(),
            published: DateValue::Parsed(NaiveDate::from_ymd_opt(2024, 11, 7).unwrap()),
            degraded,
            location: None,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_store_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let store = RecordStore::new();
        let report = store
            .flush_to_table(&path, ColumnSchema::Standard, FlushMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(report, FlushReport::NothingToSave);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_overwrite_writes_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let mut store = RecordStore::new();
        store.append(record("First", false));
        store.append(record("Second", false));
        let report = store
            .flush_to_table(&path, ColumnSchema::Titles, FlushMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(report, FlushReport::Written { path: path.clone(), rows: 2 });

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["titles", "text", "subject", "date"]);
        assert_eq!(rows[1], vec!["First", "Body, with \"quotes\"", "World", "2024-11-07"]);
    }

    #[tokio::test]
    async fn test_append_keeps_single_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");

        let mut first = RecordStore::new();
        first.append(record("First", false));
        first
            .flush_to_table(&path, ColumnSchema::Standard, FlushMode::Append)
            .await
            .unwrap();

        let mut second = RecordStore::new();
        second.append(record("Second", false));
        second
            .flush_to_table(&path, ColumnSchema::Standard, FlushMode::Append)
            .await
            .unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "title");
        assert_eq!(rows[1][0], "First");
        assert_eq!(rows[2][0], "Second");
    }

    #[test]
    fn test_quality_summary() {
        let mut store = RecordStore::new();
        store.append(record("a", true));
        let mut fallback = record("b", false);
        fallback.published = DateValue::Fallback {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            reason: FallbackReason::Unparseable("N/A".to_string()),
        };
        store.extend([fallback, record("c", false)]);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.quality(),
            QualitySummary { date_fallbacks: 1, degraded: 1 }
        );
    }

    #[tokio::test]
    async fn test_writer_truncates_once_then_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        std::fs::write(&path, "title,text,subject,date\nStale,x,y,2020-01-01\n").unwrap();

        let mut writer = TableWriter::new(&path, ColumnSchema::Standard, FlushMode::Overwrite);
        writer.write_batch(&[]).await.unwrap();
        assert_eq!(read_rows(&path).len(), 2, "empty batch must not truncate");

        writer.write_batch(&[record("First", false)]).await.unwrap();
        writer.write_batch(&[record("Second", false), record("Third", true)]).await.unwrap();

        let rows = read_rows(&path);
        let titles: Vec<_> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(titles, vec!["title", "First", "Second", "Third"]);
        assert_eq!(writer.rows_written(), 3);
    }
}
