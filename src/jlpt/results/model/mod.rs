use std::fmt;

use chrono::{Days, NaiveDate};

/// Column holding the first day of the administration month.
pub const DATE_COLUMN: &str = "Fecha";

/// Column layout of every normalized workbook and of the historical table.
pub const HISTORICAL_COLUMNS: [&str; 12] = [
    "Country/Region",
    "City (ENG)",
    "Level",
    "Type",
    "Count",
    DATE_COLUMN,
    "Año",
    "Mes",
    "City & Country/ Region",
    "Continent",
    "Country Code",
    "Flag URL",
];

/// A single untyped spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Builds a date cell from an Excel serial number (1900 date system).
    ///
    /// Serials that do not map onto a calendar day are kept as numbers.
    pub fn from_excel_serial(serial: f64) -> Self {
        excel_serial_to_date(serial)
            .map(Cell::Date)
            .unwrap_or(Cell::Number(serial))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// True for empty cells and text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }
}

/// Text used for labels, header matching and column widths.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => f.write_str(value),
            Cell::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

/// Converts an Excel serial day number into a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

/// Rows × columns of cells, read without any header inference.
pub type Grid = Vec<Vec<Cell>>;

/// A table with named columns. Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table in the historical layout from long records.
    pub fn from_records(records: &[LongRecord]) -> Self {
        let mut table = Table::new(HISTORICAL_COLUMNS.iter().map(|c| c.to_string()).collect());
        table.rows = records.iter().map(LongRecord::to_row).collect();
        table
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Appends the rows of several tables, aligning cells by column name.
    ///
    /// The resulting columns are the union of all inputs in first-seen order;
    /// cells for columns a table lacks are left empty.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut combined = Table::default();

        for table in tables {
            let positions: Vec<usize> = table
                .columns
                .iter()
                .map(|name| match combined.column_index(name) {
                    Some(index) => index,
                    None => {
                        combined.columns.push(name.clone());
                        for row in &mut combined.rows {
                            row.push(Cell::Empty);
                        }
                        combined.columns.len() - 1
                    }
                })
                .collect();

            let width = combined.columns.len();
            for row in table.rows {
                let mut aligned = vec![Cell::Empty; width];
                for (cell, position) in row.into_iter().zip(&positions) {
                    aligned[*position] = cell;
                }
                combined.rows.push(aligned);
            }
        }

        combined
    }
}

/// JLPT proficiency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl Level {
    pub const ALL: [Level; 5] = [Level::N1, Level::N2, Level::N3, Level::N4, Level::N5];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::N1 => "N1",
            Level::N2 => "N2",
            Level::N3 => "N3",
            Level::N4 => "N4",
            Level::N5 => "N5",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a count refers to registered applicants or actual examinees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Applicant,
    Examinee,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::Applicant, MetricKind::Examinee];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Applicant => "Applicant",
            MetricKind::Examinee => "Examinee",
        }
    }

    /// Plural form used in the wide column names, e.g. `N1 Applicants`.
    pub fn plural(self) -> &'static str {
        match self {
            MetricKind::Applicant => "Applicants",
            MetricKind::Examinee => "Examinees",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test administration identified by year and half-year code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub code: u32,
}

impl Period {
    pub fn new(year: i32, code: u32) -> Self {
        Self { year, code }
    }

    /// Calendar month of the administration: July for code 1, December for 2.
    pub fn month(&self) -> Option<u32> {
        match self.code {
            1 => Some(7),
            2 => Some(12),
            _ => None,
        }
    }

    pub fn month_name(&self) -> &'static str {
        match self.code {
            1 => "July",
            2 => "December",
            _ => "",
        }
    }

    /// First day of the administration month.
    pub fn date(&self) -> Option<NaiveDate> {
        self.month()
            .and_then(|month| NaiveDate::from_ymd_opt(self.year, month, 1))
    }
}

/// One count for a (country, city, level, type) combination, enriched with
/// period and geographic metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub country: String,
    pub city: String,
    pub level: Level,
    pub kind: MetricKind,
    pub count: Cell,
    pub period: Period,
    pub continent: String,
    pub country_code: Option<String>,
    pub flag_url: Option<String>,
}

impl LongRecord {
    /// Combined "city, country" label.
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    /// Cells in the order of [`HISTORICAL_COLUMNS`].
    pub fn to_row(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.country.as_str()),
            Cell::from(self.city.as_str()),
            Cell::from(self.level.as_str()),
            Cell::from(self.kind.as_str()),
            self.count.clone(),
            self.period.date().map(Cell::Date).unwrap_or(Cell::Empty),
            Cell::Number(f64::from(self.period.year)),
            Cell::from(self.period.month_name()),
            Cell::from(self.label()),
            Cell::from(self.continent.as_str()),
            Cell::from(self.country_code.clone()),
            Cell::from(self.flag_url.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn period_codes_map_to_july_and_december() {
        let july = Period::new(2023, 1);
        assert_eq!(july.date(), NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(july.month_name(), "July");

        let december = Period::new(2023, 2);
        assert_eq!(december.date(), NaiveDate::from_ymd_opt(2023, 12, 1));
        assert_eq!(december.month_name(), "December");

        let unknown = Period::new(2023, 3);
        assert_eq!(unknown.date(), None);
        assert_eq!(unknown.month_name(), "");
    }

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(Cell::Number(120.0).to_string(), "120");
        assert_eq!(Cell::Number(1.5).to_string(), "1.5");
        assert_eq!(Cell::Empty.to_string(), "");
    }

    #[test]
    fn excel_serials_convert_to_dates() {
        assert_eq!(
            Cell::from_excel_serial(45108.0),
            Cell::Date(NaiveDate::from_ymd_opt(2023, 7, 1).unwrap())
        );
        assert_eq!(Cell::from_excel_serial(-3.0), Cell::Number(-3.0));
    }

    #[test]
    fn concat_aligns_columns_by_name() {
        let first = table(&["a", "b"], vec![vec![Cell::from("1"), Cell::from("2")]]);
        let second = table(&["b", "c"], vec![vec![Cell::from("3"), Cell::from("4")]]);

        let combined = Table::concat([first, second]);

        assert_eq!(combined.columns, vec!["a", "b", "c"]);
        assert_eq!(
            combined.rows,
            vec![
                vec![Cell::from("1"), Cell::from("2"), Cell::Empty],
                vec![Cell::Empty, Cell::from("3"), Cell::from("4")],
            ]
        );
    }
}
