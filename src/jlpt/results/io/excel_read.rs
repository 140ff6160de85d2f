use std::path::Path;

use calamine::{DataType, Range, Reader, Sheets, open_workbook_auto};

use crate::jlpt::results::error::{Result, ToolError};
use crate::jlpt::results::model::{Cell, Grid, Table};

/// Reads the first sheet of a workbook as a raw grid, without header
/// inference. The grid is anchored at cell A1 so leading blank rows and
/// columns keep their positions.
pub fn read_grid(path: &Path) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path)?;
    let range = read_first_sheet(&mut workbook, path)?;
    Ok(range_to_grid(&range))
}

/// Reads every sheet of a workbook, in workbook order.
pub fn read_sheets(path: &Path) -> Result<Vec<(String, Grid)>> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))??;
        sheets.push((name, range_to_grid(&range)));
    }
    Ok(sheets)
}

/// Reads the first sheet as a table whose first row holds the column names.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut rows = read_grid(path)?.into_iter();

    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(Cell::to_string).collect(),
        None => return Ok(Table::default()),
    };
    let width = columns.len();

    let mut table = Table::new(columns);
    for mut row in rows {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        row.resize(width, Cell::Empty);
        table.rows.push(row);
    }
    Ok(table)
}

fn read_first_sheet<RS: std::io::Read + std::io::Seek>(
    workbook: &mut Sheets<RS>,
    path: &Path,
) -> Result<Range<DataType>> {
    let range_result = workbook.worksheet_range_at(0).ok_or_else(|| {
        ToolError::InvalidWorkbook(format!("{} has no worksheet", path.display()))
    })?;
    Ok(range_result?)
}

fn range_to_grid(range: &Range<DataType>) -> Grid {
    let Some((last_row, last_col)) = range.end() else {
        return Grid::new();
    };

    (0..=last_row)
        .map(|row| {
            (0..=last_col)
                .map(|col| {
                    range
                        .get_value((row, col))
                        .map(to_cell)
                        .unwrap_or(Cell::Empty)
                })
                .collect()
        })
        .collect()
}

fn to_cell(value: &DataType) -> Cell {
    match value {
        DataType::Empty => Cell::Empty,
        DataType::String(value) => Cell::Text(value.clone()),
        DataType::Float(value) => Cell::Number(*value),
        DataType::Int(value) => Cell::Number(*value as f64),
        DataType::Bool(value) => Cell::Bool(*value),
        DataType::DateTime(serial) => Cell::from_excel_serial(*serial),
        other => Cell::Text(other.to_string()),
    }
}
