use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument};

use crate::jlpt::results::error::{Result, ToolError};
use crate::jlpt::results::io::{excel_read, excel_write};

/// Capability to turn a legacy `.xls` workbook into the `.xlsx` container.
///
/// Implementations may hold an external resource for the whole conversion
/// stage; [`LegacyConverter::shutdown`] is called once when the stage ends.
pub trait LegacyConverter {
    /// Converts `source` into a new workbook written at `target`.
    fn convert(&mut self, source: &Path, target: &Path) -> Result<()>;

    /// Releases whatever the converter acquired.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Converts in-process: decodes with calamine and re-encodes every sheet
/// with rust_xlsxwriter.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryConverter;

impl LegacyConverter for LibraryConverter {
    #[instrument(
        level = "debug",
        skip_all,
        fields(source = %source.display(), target = %target.display())
    )]
    fn convert(&mut self, source: &Path, target: &Path) -> Result<()> {
        let sheets = excel_read::read_sheets(source)?;
        debug!(sheet_count = sheets.len(), "decoded legacy workbook");
        excel_write::write_grids(target, &sheets)
    }
}

/// Drives a headless office suite (LibreOffice's `soffice`) to re-save
/// legacy workbooks. Each conversion starts its own office process, so
/// nothing stays running between files.
#[derive(Debug)]
pub struct OfficeConverter {
    program: PathBuf,
}

impl OfficeConverter {
    /// Probes the office executable once so a missing installation fails
    /// before any file is touched.
    pub fn launch(program: impl Into<PathBuf>) -> Result<Self> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("--version")
            .output()
            .map_err(|error| ToolError::Conversion {
                file: program.clone(),
                message: format!("office application unavailable: {error}"),
            })?;
        let version = String::from_utf8_lossy(&output.stdout);
        info!(
            program = %program.display(),
            version = %version.trim(),
            "office application ready"
        );
        Ok(Self { program })
    }
}

impl LegacyConverter for OfficeConverter {
    #[instrument(
        level = "debug",
        skip_all,
        fields(source = %source.display(), target = %target.display())
    )]
    fn convert(&mut self, source: &Path, target: &Path) -> Result<()> {
        let outdir = target
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = source.file_stem().unwrap_or_default().to_string_lossy();
        let produced = outdir.join(format!("{stem}.xlsx"));

        // The office suite exits successfully even when it cannot load the
        // source, so only a freshly written file counts as a conversion.
        remove_stale(target)?;
        remove_stale(&produced)?;

        let output = Command::new(&self.program)
            .args(["--headless", "--norestore", "--convert-to", "xlsx", "--outdir"])
            .arg(outdir)
            .arg(source)
            .output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(ToolError::Conversion {
                file: source.to_path_buf(),
                message: stderr,
            });
        }
        if !produced.is_file() {
            let message = if stderr.is_empty() {
                format!("expected output {} was not produced", produced.display())
            } else {
                stderr
            };
            return Err(ToolError::Conversion {
                file: source.to_path_buf(),
                message,
            });
        }
        if produced != target {
            fs::rename(&produced, target)?;
        }
        Ok(())
    }
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale workbook");
            Ok(())
        }
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}
