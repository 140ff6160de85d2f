use std::fs;
use std::path::{Path, PathBuf};

use crate::jlpt::results::error::{Result, ToolError};

/// Environment variable naming the directory with the raw result workbooks.
pub const SOURCE_DIR_VAR: &str = "Carpeta_Excel_Raw";
/// Environment variable naming the root of every generated file.
pub const OUTPUT_DIR_VAR: &str = "Carpeta_Consolidada";

pub const STAGING_DIR_NAME: &str = "temp";
pub const NORMALIZED_DIR_NAME: &str = "normalizado";
pub const HISTORICAL_FILE_NAME: &str = "JLPT_Historico.xlsx";
pub const HISTORICAL_SHEET_NAME: &str = "JLPT_Historico";

/// Directory layout of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Resolves both directories against the current directory. An empty
    /// path stands for the current directory itself.
    pub fn new(source_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            source_dir: resolve(source_dir.as_ref())?,
            output_dir: resolve(output_dir.as_ref())?,
        })
    }

    /// Holds format-converted, not yet reshaped workbooks.
    pub fn staging_dir(&self) -> PathBuf {
        self.output_dir.join(STAGING_DIR_NAME)
    }

    /// Holds one reshaped workbook per staged input.
    pub fn normalized_dir(&self) -> PathBuf {
        self.output_dir.join(NORMALIZED_DIR_NAME)
    }

    pub fn historical_path(&self) -> PathBuf {
        self.output_dir.join(HISTORICAL_FILE_NAME)
    }

    /// Checks the source directory and creates the working directories.
    pub fn prepare(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(ToolError::MissingInput(self.source_dir.clone()));
        }
        fs::create_dir_all(self.staging_dir())?;
        fs::create_dir_all(self.normalized_dir())?;
        Ok(())
    }
}

fn resolve(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let current = std::env::current_dir()?;
    if path.as_os_str().is_empty() {
        Ok(current)
    } else {
        Ok(current.join(path))
    }
}
