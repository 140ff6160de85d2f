use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::jlpt::results::config::{HISTORICAL_SHEET_NAME, PipelineConfig};
use crate::jlpt::results::error::{Result, ToolError};
use crate::jlpt::results::io::convert::LegacyConverter;
use crate::jlpt::results::io::{excel_read, excel_write};
use crate::jlpt::results::model::{Cell, DATE_COLUMN, Table, excel_serial_to_date};
use crate::jlpt::results::reference::CountryDirectory;
use crate::jlpt::results::reshape::period::{normalized_stem, parse_period};
use crate::jlpt::results::reshape::reshape_grid;

/// Prefix of the lock files office applications leave next to open workbooks.
pub const LOCK_FILE_PREFIX: &str = "~$";
/// Sheet name of every normalized workbook.
pub const NORMALIZED_SHEET_NAME: &str = "Sheet1";

const LEGACY_EXTENSION: &str = "xls";
const MODERN_EXTENSION: &str = "xlsx";

/// Files a stage produced and files it skipped because of an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl StageReport {
    fn record_failure(&mut self, path: &Path, error: &ToolError) {
        warn!(file = %display_name(path), %error, "skipping file");
        self.failed.push((path.to_path_buf(), error.to_string()));
    }
}

/// Runs conversion, normalization and consolidation in order and returns the
/// path of the historical workbook.
#[instrument(
    level = "info",
    skip_all,
    fields(source = %config.source_dir.display(), output = %config.output_dir.display())
)]
pub fn run(config: &PipelineConfig, converter: &mut dyn LegacyConverter) -> Result<PathBuf> {
    config.prepare()?;
    let directory = CountryDirectory::bundled()?;

    let converted = convert_sources(&config.source_dir, &config.staging_dir(), converter)?;
    info!(
        staged = converted.succeeded.len(),
        failed = converted.failed.len(),
        "conversion finished"
    );

    let normalized = normalize_staged(&config.staging_dir(), &config.normalized_dir(), &directory)?;
    info!(
        normalized = normalized.succeeded.len(),
        failed = normalized.failed.len(),
        "normalization finished"
    );

    let historical_path = config.historical_path();
    let historical = consolidate(&config.normalized_dir(), &historical_path)?;
    info!(
        rows = historical.rows.len(),
        path = %historical_path.display(),
        "historical workbook written"
    );
    Ok(historical_path)
}

/// Stages every workbook of `source`: legacy `.xls` files go through the
/// converter, `.xlsx` files are copied unchanged. The converter is shut down
/// once the stage ends, whatever the outcome.
#[instrument(
    level = "info",
    skip_all,
    fields(source = %source.display(), staging = %staging.display())
)]
pub fn convert_sources(
    source: &Path,
    staging: &Path,
    converter: &mut dyn LegacyConverter,
) -> Result<StageReport> {
    let outcome = stage_entries(source, staging, converter);
    if let Err(error) = converter.shutdown() {
        warn!(%error, "converter did not shut down cleanly");
    }
    outcome
}

fn stage_entries(
    source: &Path,
    staging: &Path,
    converter: &mut dyn LegacyConverter,
) -> Result<StageReport> {
    let mut report = StageReport::default();

    for path in sorted_files(source)? {
        let result = match extension(&path).as_deref() {
            Some(LEGACY_EXTENSION) => {
                let target = staging.join(format!("{}.{MODERN_EXTENSION}", file_stem(&path)));
                converter.convert(&path, &target).map(|()| target)
            }
            Some(MODERN_EXTENSION) => {
                let target = staging.join(display_name(&path));
                fs::copy(&path, &target)
                    .map(|_| target)
                    .map_err(ToolError::from)
            }
            _ => {
                debug!(file = %display_name(&path), "not a workbook");
                continue;
            }
        };

        match result {
            Ok(target) => {
                info!(
                    file = %display_name(&path),
                    staged = %display_name(&target),
                    "workbook staged"
                );
                report.succeeded.push(target);
            }
            Err(error) => report.record_failure(&path, &error),
        }
    }

    Ok(report)
}

/// Reshapes every staged `.xlsx` workbook into `normalized`.
#[instrument(
    level = "info",
    skip_all,
    fields(staging = %staging.display(), normalized = %normalized.display())
)]
pub fn normalize_staged(
    staging: &Path,
    normalized: &Path,
    directory: &CountryDirectory,
) -> Result<StageReport> {
    let mut report = StageReport::default();

    for path in sorted_files(staging)? {
        if extension(&path).as_deref() != Some(MODERN_EXTENSION) {
            continue;
        }
        match normalize_file(&path, normalized, directory) {
            Ok(output) => report.succeeded.push(output),
            Err(error) => report.record_failure(&path, &error),
        }
    }

    Ok(report)
}

/// Reshapes one staged workbook and writes `{base}_Normalizado.xlsx` into
/// `output_dir`.
#[instrument(level = "debug", skip_all, fields(input = %input.display()))]
pub fn normalize_file(
    input: &Path,
    output_dir: &Path,
    directory: &CountryDirectory,
) -> Result<PathBuf> {
    let stem = file_stem(input);
    let period = parse_period(&stem)?;
    let output = output_dir.join(format!("{}.{MODERN_EXTENSION}", normalized_stem(&stem)));

    let grid = excel_read::read_grid(input)?;
    let records = reshape_grid(grid, period, directory)?;
    let table = Table::from_records(&records);
    excel_write::write_table(&output, NORMALIZED_SHEET_NAME, &table, false)?;

    info!(
        file = %display_name(input),
        records = records.len(),
        output = %display_name(&output),
        "workbook normalized"
    );
    Ok(output)
}

/// Concatenates every normalized workbook, in file-name order, into one
/// historical table written to `output` with auto-sized columns.
///
/// Unreadable files are logged and left out; having nothing to concatenate
/// is an error.
#[instrument(
    level = "info",
    skip_all,
    fields(normalized = %normalized.display(), output = %output.display())
)]
pub fn consolidate(normalized: &Path, output: &Path) -> Result<Table> {
    let mut tables = Vec::new();

    for path in sorted_files(normalized)? {
        let name = display_name(&path);
        if name.starts_with(LOCK_FILE_PREFIX) {
            debug!(file = %name, "skipping lock file");
            continue;
        }
        if extension(&path).as_deref() != Some(MODERN_EXTENSION) {
            continue;
        }
        match excel_read::read_table(&path) {
            Ok(table) => {
                debug!(file = %name, rows = table.rows.len(), "read normalized workbook");
                tables.push(table);
            }
            Err(error) => warn!(file = %name, %error, "could not read workbook"),
        }
    }

    if tables.is_empty() {
        return Err(ToolError::NothingToConsolidate(normalized.to_path_buf()));
    }

    let mut historical = Table::concat(tables);
    coerce_date_column(&mut historical, DATE_COLUMN)?;
    excel_write::write_table(output, HISTORICAL_SHEET_NAME, &historical, true)?;
    Ok(historical)
}

/// Turns every non-empty cell of `column` into a date. Missing columns are
/// left alone.
pub fn coerce_date_column(table: &mut Table, column: &str) -> Result<()> {
    let Some(index) = table.column_index(column) else {
        return Ok(());
    };

    for row in &mut table.rows {
        let Some(cell) = row.get_mut(index) else {
            continue;
        };
        let coerced = match &*cell {
            Cell::Empty | Cell::Date(_) => continue,
            Cell::Number(serial) => excel_serial_to_date(*serial).map(Cell::Date),
            Cell::Text(text) if text.trim().is_empty() => Some(Cell::Empty),
            Cell::Text(text) => parse_date(text.trim()).map(Cell::Date),
            Cell::Bool(_) => None,
        };
        match coerced {
            Some(value) => *cell = value,
            None => {
                return Err(ToolError::InvalidLiteral {
                    column: column.to_string(),
                    value: cell.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|datetime| datetime.date())
        })
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
