use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use jlpt_history::config::{OUTPUT_DIR_VAR, PipelineConfig, SOURCE_DIR_VAR};
use jlpt_history::io::convert::{LegacyConverter, LibraryConverter, OfficeConverter};
use jlpt_history::{Result, ToolError, pipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;

    let config = PipelineConfig::new(
        cli.source.unwrap_or_default(),
        cli.output.unwrap_or_default(),
    )?;
    let mut converter: Box<dyn LegacyConverter> = match cli.converter {
        ConverterKind::Library => Box::new(LibraryConverter),
        ConverterKind::Office => Box::new(OfficeConverter::launch(&cli.office_program)?),
    };
    info!(converter = %cli.converter, "starting pipeline");

    let historical = pipeline::run(&config, converter.as_mut())?;
    info!(path = %historical.display(), "consolidated workbook saved");
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate JLPT result workbooks into one historical table."
)]
struct Cli {
    /// Directory holding the raw .xls/.xlsx result workbooks.
    #[arg(long, env = SOURCE_DIR_VAR)]
    source: Option<PathBuf>,

    /// Root directory for staged, normalized and consolidated workbooks.
    #[arg(long, env = OUTPUT_DIR_VAR)]
    output: Option<PathBuf>,

    /// How legacy .xls workbooks are converted.
    #[arg(long, value_enum, default_value_t = ConverterKind::Library)]
    converter: ConverterKind,

    /// Office executable used by the `office` converter.
    #[arg(long, default_value = "soffice")]
    office_program: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ConverterKind {
    /// Decode and re-encode in-process.
    Library,
    /// Drive a headless office suite.
    Office,
}

impl std::fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterKind::Library => write!(f, "library"),
            ConverterKind::Office => write!(f, "office"),
        }
    }
}
