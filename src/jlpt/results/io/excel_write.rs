use std::path::Path;

use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::jlpt::results::error::Result;
use crate::jlpt::results::model::{Cell, Grid, Table};

const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Writes a headed table to a single named sheet.
///
/// With `autosize` set, every column is widened to its longest rendered
/// value (header included) plus two characters.
pub fn write_table(path: &Path, sheet_name: &str, table: &Table, autosize: bool) -> Result<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header.as_str())?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, (row_idx + 1) as u32, col_idx as u16, cell, &date_format)?;
        }
    }

    if autosize {
        for (col_idx, width) in column_widths(table).into_iter().enumerate() {
            worksheet.set_column_width(col_idx as u16, width as f64)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Writes raw grids, one sheet each, keeping every cell at its position.
pub fn write_grids(path: &Path, sheets: &[(String, Grid)]) -> Result<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for (name, grid) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name.as_str())?;

        for (row_idx, row) in grid.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                write_cell(worksheet, row_idx as u32, col_idx as u16, cell, &date_format)?;
            }
        }
    }

    if sheets.is_empty() {
        workbook.add_worksheet();
    }

    workbook.save(path)?;
    Ok(())
}

/// Width of each column: longest rendered value, in characters, plus two.
pub fn column_widths(table: &Table) -> Vec<usize> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(col_idx, header)| {
            let longest = table
                .rows
                .iter()
                .filter_map(|row| row.get(col_idx))
                .map(|cell| cell.to_string().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0);
            longest + 2
        })
        .collect()
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    date_format: &Format,
) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(value) => {
            worksheet.write_string(row, col, value.as_str())?;
        }
        Cell::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        Cell::Bool(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        Cell::Date(value) => {
            let datetime =
                ExcelDateTime::from_ymd(value.year() as u16, value.month() as u8, value.day() as u8)?;
            worksheet.write_datetime_with_format(row, col, &datetime, date_format)?;
        }
    }
    Ok(())
}
