//! Turns one raw results sheet into long records.
//!
//! The raw export carries a decorative first row and index column, two
//! Japanese-only name columns, a trailing total column, and country names
//! that only appear on the first city row of each country. Reshaping strips
//! all of that and emits one record per (country, city, level, type).

pub mod country;
pub mod period;
pub mod script;

use tracing::debug;

use crate::jlpt::results::error::{Result, ToolError};
use crate::jlpt::results::model::{Cell, Grid, Level, LongRecord, MetricKind, Period};
use crate::jlpt::results::reference::{CountryDirectory, flag_url};

use self::country::canonicalize_country;
use self::script::{contains_japanese, nfkc};

/// Header cell marking the start of the per-row total columns.
pub const TOTAL_MARKER: &str = "合計";
/// Widest sheet kept after the total marker is applied.
pub const MAX_COLUMNS: usize = 14;

/// Source column positions (before any drop) holding Japanese-only names.
const DROPPED_SOURCE_COLUMNS: [usize; 2] = [2, 3];
const HEADER_TOKENS: [(&str, &str); 2] = [("応募者", "Applicant"), ("受験者", "Examinee")];

/// A count column of the wide layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
    pub level: Level,
    pub kind: MetricKind,
}

impl Metric {
    /// Wide column name, e.g. `N3 Examinees`.
    pub fn column_name(&self) -> String {
        format!("{} {}", self.level, self.kind.plural())
    }
}

/// One (country, city) row of the wide layout.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub country: String,
    pub city: String,
    pub counts: Vec<Cell>,
}

/// Runs every reshaping step over a raw grid.
pub fn reshape_grid(
    grid: Grid,
    period: Period,
    directory: &CountryDirectory,
) -> Result<Vec<LongRecord>> {
    let grid = strip_decorations(grid);
    let grid = truncate_columns(grid);
    let grid = translate_tokens(grid);
    let (header, body) = split_header(grid)?;
    let metrics = target_metrics(header.len())?;
    debug!(
        columns = ?target_header(&metrics),
        rows = body.len(),
        "mapped sheet header"
    );

    let rows = clean_rows(body);
    Ok(melt(&rows, &metrics, period, directory))
}

/// Drops the decorative first row, the index column and the two
/// Japanese-only name columns. Ragged rows are padded first.
pub fn strip_decorations(grid: Grid) -> Grid {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);

    grid.into_iter()
        .skip(1)
        .map(|mut row| {
            row.resize(width, Cell::Empty);
            row.into_iter()
                .enumerate()
                .filter(|(position, _)| {
                    *position != 0 && !DROPPED_SOURCE_COLUMNS.contains(position)
                })
                .map(|(_, cell)| cell)
                .collect()
        })
        .collect()
}

/// Cuts every row at the total marker of the header row, then caps the
/// width at [`MAX_COLUMNS`].
pub fn truncate_columns(mut grid: Grid) -> Grid {
    let total_at = grid.first().and_then(|header| {
        header
            .iter()
            .position(|cell| nfkc(&cell.to_string()) == TOTAL_MARKER)
    });

    let keep = total_at.unwrap_or(usize::MAX).min(MAX_COLUMNS);
    for row in &mut grid {
        row.truncate(keep);
    }
    grid
}

/// Replaces the Japanese applicant/examinee labels wherever they appear.
pub fn translate_tokens(mut grid: Grid) -> Grid {
    for cell in grid.iter_mut().flatten() {
        if let Cell::Text(value) = cell {
            let replacement = HEADER_TOKENS
                .iter()
                .find(|(token, _)| *token == value.as_str())
                .map(|(_, english)| english.to_string());
            if let Some(english) = replacement {
                *value = english;
            }
        }
    }
    grid
}

fn split_header(grid: Grid) -> Result<(Vec<String>, Grid)> {
    let mut rows = grid.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| ToolError::InvalidWorkbook("sheet has no header row".into()))?;
    let header = header.iter().map(|cell| nfkc(&cell.to_string())).collect();
    Ok((header, rows.collect()))
}

/// Count columns for a sheet `width` columns wide: one applicant/examinee
/// pair per level, in level order, for as long as the sheet has pairs left.
///
/// The mapped header must cover every column exactly.
pub fn target_metrics(width: usize) -> Result<Vec<Metric>> {
    let mut metrics = Vec::new();
    let mut mapped = 2;

    for level in Level::ALL {
        if mapped + 1 < width {
            metrics.extend(MetricKind::ALL.map(|kind| Metric { level, kind }));
            mapped += 2;
        }
    }

    if mapped != width {
        return Err(ToolError::InvalidWorkbook(format!(
            "sheet has {width} columns after trimming but the header maps {mapped}"
        )));
    }
    Ok(metrics)
}

/// Full wide header for the given count columns.
pub fn target_header(metrics: &[Metric]) -> Vec<String> {
    ["Country/Region".to_string(), "City (ENG)".to_string()]
        .into_iter()
        .chain(metrics.iter().map(Metric::column_name))
        .collect()
}

/// Fixes up the country column and drops rows without country or city.
pub fn clean_rows(body: Grid) -> Vec<WideRow> {
    let mut countries: Vec<Option<String>> = body
        .iter()
        .map(|row| match row.first() {
            None | Some(Cell::Empty) => None,
            Some(cell) => Some(cell.to_string()),
        })
        .collect();

    repair_merged_countries(&mut countries);
    let mut countries: Vec<Option<String>> = countries
        .iter()
        .map(|value| normalize_country(value.as_deref()))
        .collect();
    forward_fill(&mut countries);

    body.into_iter()
        .zip(countries)
        .filter_map(|(row, country)| {
            let country = country?;
            let mut cells = row.into_iter().skip(1);
            let city = cells.next().unwrap_or(Cell::Empty);
            if city.is_blank() {
                return None;
            }
            Some(WideRow {
                country,
                city: city.to_string(),
                counts: cells.collect(),
            })
        })
        .collect()
}

/// A country cell in Japanese script takes the value of the row below it.
///
/// Only one row of lookahead is used; a merge spanning several rows keeps
/// Japanese text in all but the last merged row.
pub fn repair_merged_countries(countries: &mut [Option<String>]) {
    for idx in 0..countries.len().saturating_sub(1) {
        if countries[idx].as_deref().is_some_and(contains_japanese) {
            countries[idx] = countries[idx + 1].as_deref().map(nfkc);
        }
    }
}

/// NFKC-normalizes a country cell; Japanese-script or blank values are unknown.
pub fn normalize_country(value: Option<&str>) -> Option<String> {
    let normalized = nfkc(value?);
    if normalized.trim().is_empty() || contains_japanese(&normalized) {
        None
    } else {
        Some(normalized)
    }
}

/// Unknown countries inherit the nearest known value above them.
pub fn forward_fill(countries: &mut [Option<String>]) {
    let mut last: Option<String> = None;
    for country in countries.iter_mut() {
        match country {
            Some(value) => last = Some(value.clone()),
            None => *country = last.clone(),
        }
    }
}

/// Wide → long, column by column, with period and geographic metadata.
pub fn melt(
    rows: &[WideRow],
    metrics: &[Metric],
    period: Period,
    directory: &CountryDirectory,
) -> Vec<LongRecord> {
    let mut records = Vec::with_capacity(rows.len() * metrics.len());

    for (column, metric) in metrics.iter().enumerate() {
        for row in rows {
            let country = canonicalize_country(&row.country);
            let country_code = directory.alpha2(&country).map(str::to_string);
            records.push(LongRecord {
                continent: directory.continent(&country).to_string(),
                flag_url: country_code.as_deref().map(flag_url),
                country_code,
                country,
                city: row.city.clone(),
                level: metric.level,
                kind: metric.kind,
                count: row.counts.get(column).cloned().unwrap_or(Cell::Empty),
                period,
            });
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> CountryDirectory {
        CountryDirectory::bundled().expect("bundled countries parse")
    }

    /// Builds a sheet in the raw export layout: decorative row and index
    /// column, Japanese name columns at 2 and 3, counts, then a total column.
    fn raw_sheet(rows: &[(&str, &str, f64)]) -> Grid {
        let mut header = vec![
            Cell::Empty,
            Cell::from("国・地域"),
            Cell::from("国"),
            Cell::from("都市"),
            Cell::from("City"),
        ];
        for level in Level::ALL {
            header.push(Cell::from(level.as_str()));
            header.push(Cell::from("受験者"));
        }
        header.push(Cell::from("合計"));
        header.push(Cell::from("備考"));

        let mut grid = vec![vec![Cell::from("JLPT"); header.len()], header];
        for (index, (country, city, base)) in rows.iter().enumerate() {
            let mut row = vec![
                Cell::Number(index as f64 + 1.0),
                if country.is_empty() { Cell::Empty } else { Cell::from(*country) },
                Cell::from("国"),
                Cell::from("都市"),
                if city.is_empty() { Cell::Empty } else { Cell::from(*city) },
            ];
            row.extend((0..10).map(|offset| Cell::Number(base + offset as f64)));
            row.push(Cell::Number(999.0));
            grid.push(row);
        }
        grid
    }

    fn countries(records: &[LongRecord]) -> Vec<(String, String)> {
        records
            .iter()
            .filter(|record| record.level == Level::N1 && record.kind == MetricKind::Applicant)
            .map(|record| (record.country.clone(), record.city.clone()))
            .collect()
    }

    #[test]
    fn reshapes_wide_sheet_into_long_records() {
        let grid = raw_sheet(&[("Japan", "Tokyo", 100.0), ("", "Osaka", 200.0)]);

        let records = reshape_grid(grid, Period::new(2023, 1), &directory()).expect("reshaped");

        assert_eq!(records.len(), 2 * 10);
        let first = &records[0];
        assert_eq!(first.country, "Japan");
        assert_eq!(first.city, "Tokyo");
        assert_eq!(first.level, Level::N1);
        assert_eq!(first.kind, MetricKind::Applicant);
        assert_eq!(first.count, Cell::Number(100.0));
        assert_eq!(first.period.month_name(), "July");

        let last = records.last().expect("records present");
        assert_eq!(last.city, "Osaka");
        assert_eq!(last.level, Level::N5);
        assert_eq!(last.kind, MetricKind::Examinee);
        assert_eq!(last.count, Cell::Number(209.0));
    }

    #[test]
    fn country_is_forward_filled() {
        let grid = raw_sheet(&[
            ("India", "Delhi", 1.0),
            ("", "Mumbai", 1.0),
            ("", "Chennai", 1.0),
            ("Nepal", "Kathmandu", 1.0),
            ("", "Pokhara", 1.0),
        ]);

        let records = reshape_grid(grid, Period::new(2022, 2), &directory()).expect("reshaped");

        assert_eq!(
            countries(&records),
            vec![
                ("India".to_string(), "Delhi".to_string()),
                ("India".to_string(), "Mumbai".to_string()),
                ("India".to_string(), "Chennai".to_string()),
                ("Nepal".to_string(), "Kathmandu".to_string()),
                ("Nepal".to_string(), "Pokhara".to_string()),
            ]
        );
    }

    #[test]
    fn cleaned_rows_split_city_from_counts() {
        let body = vec![
            vec![
                Cell::from("Peru"),
                Cell::from("Lima"),
                Cell::Number(4.0),
                Cell::Number(5.0),
            ],
            vec![Cell::Empty, Cell::from("Cusco"), Cell::Number(1.0)],
        ];

        let rows = clean_rows(body);

        assert_eq!(
            rows,
            vec![
                WideRow {
                    country: "Peru".to_string(),
                    city: "Lima".to_string(),
                    counts: vec![Cell::Number(4.0), Cell::Number(5.0)],
                },
                WideRow {
                    country: "Peru".to_string(),
                    city: "Cusco".to_string(),
                    counts: vec![Cell::Number(1.0)],
                },
            ]
        );
    }

    #[test]
    fn rows_without_city_or_country_are_dropped() {
        let grid = raw_sheet(&[
            ("", "Nowhere", 1.0),
            ("Thailand", "Bangkok", 1.0),
            ("", "   ", 1.0),
            ("", "", 1.0),
            ("", "Chiang Mai", 1.0),
        ]);

        let records = reshape_grid(grid, Period::new(2022, 1), &directory()).expect("reshaped");

        assert_eq!(
            countries(&records),
            vec![
                ("Thailand".to_string(), "Bangkok".to_string()),
                ("Thailand".to_string(), "Chiang Mai".to_string()),
            ]
        );
    }

    #[test]
    fn merged_japanese_country_takes_next_row() {
        let mut values = vec![Some("中国".to_string()), Some("China".to_string())];
        repair_merged_countries(&mut values);
        assert_eq!(values, vec![Some("China".to_string()), Some("China".to_string())]);
    }

    #[test]
    fn remaining_japanese_country_is_not_propagated() {
        let grid = raw_sheet(&[
            ("Vietnam", "Hanoi", 1.0),
            ("ベトナム", "Da Nang", 1.0),
        ]);

        let records = reshape_grid(grid, Period::new(2021, 2), &directory()).expect("reshaped");

        assert!(records.iter().all(|record| !contains_japanese(&record.country)));
        assert_eq!(
            countries(&records),
            vec![
                ("Vietnam".to_string(), "Hanoi".to_string()),
                ("Vietnam".to_string(), "Da Nang".to_string()),
            ]
        );
        assert_eq!(normalize_country(Some("ベトナム")), None);
    }

    #[test]
    fn korea_is_enriched_with_geography() {
        let grid = raw_sheet(&[("Korea", "Seoul", 10.0)]);

        let records = reshape_grid(grid, Period::new(2023, 2), &directory()).expect("reshaped");
        let record = &records[0];

        assert_eq!(record.country, "South Korea");
        assert_eq!(record.continent, "Asia");
        assert_eq!(record.country_code.as_deref(), Some("KR"));
        assert_eq!(record.flag_url.as_deref(), Some("https://flagcdn.com/w40/kr.png"));
        assert_eq!(record.label(), "Seoul, South Korea");
    }

    #[test]
    fn unknown_country_has_no_code() {
        let grid = raw_sheet(&[("Atlantis", "Poseidonia", 1.0)]);

        let records = reshape_grid(grid, Period::new(2023, 2), &directory()).expect("reshaped");

        assert_eq!(records[0].continent, "Unknown");
        assert_eq!(records[0].country_code, None);
        assert_eq!(records[0].flag_url, None);
    }

    #[test]
    fn header_tokens_are_translated() {
        let grid = translate_tokens(vec![vec![Cell::from("応募者"), Cell::from("受験者 ")]]);
        assert_eq!(grid[0][0], Cell::from("Applicant"));
        assert_eq!(grid[0][1], Cell::from("受験者 "));
    }

    #[test]
    fn target_metrics_cover_every_column() {
        assert_eq!(target_metrics(12).expect("five levels").len(), 10);
        assert_eq!(target_metrics(6).expect("two levels").len(), 4);
        assert_eq!(
            target_header(&target_metrics(4).expect("one level")),
            vec!["Country/Region", "City (ENG)", "N1 Applicants", "N1 Examinees"]
        );
        assert!(target_metrics(13).is_err());
        assert!(target_metrics(14).is_err());
        assert!(target_metrics(1).is_err());
    }

    #[test]
    fn sheet_without_total_marker_is_capped() {
        let row: Vec<Cell> = (0..20).map(|n| Cell::Number(n as f64)).collect();
        let grid = truncate_columns(vec![row.clone(), row]);
        assert!(grid.iter().all(|row| row.len() == MAX_COLUMNS));
    }
}
