//! Spreadsheet grid to row table
//!
//! The OTE report has a few banner lines above the real header row, and the
//! header cells carry embedded line breaks and doubled spaces.

use std::collections::HashMap;

use crate::models::{parse_cell, Metric, MetricFields, Row, RowTable, INTERVAL_HEADER};

use super::SourceError;

/// Normalizes a header cell: trim, drop line breaks, collapse runs of spaces.
pub fn clean_header(raw: &str) -> String {
    let joined: String = raw.trim().chars().filter(|c| *c != '\n' && *c != '\r').collect();
    joined.split(' ').filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

fn find_header_row(grid: &[Vec<String>]) -> Option<usize> {
    grid.iter()
        .position(|row| row.iter().any(|cell| clean_header(cell) == INTERVAL_HEADER))
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Builds a table from the rows below the header, in sheet order.
pub fn table_from_grid(grid: &[Vec<String>]) -> Result<RowTable, SourceError> {
    if grid.is_empty() {
        return Err(SourceError::Parse("downloaded sheet is empty".to_string()));
    }

    let header_idx = find_header_row(grid).ok_or_else(|| {
        SourceError::Parse(format!("header row with '{}' not found", INTERVAL_HEADER))
    })?;

    let columns: HashMap<String, usize> = grid[header_idx]
        .iter()
        .enumerate()
        .map(|(idx, raw)| (clean_header(raw), idx))
        .collect();

    let column = |header: &str| {
        columns
            .get(header)
            .copied()
            .ok_or_else(|| SourceError::Parse(format!("missing column '{}'", header)))
    };

    let interval_col = column(INTERVAL_HEADER)?;
    let mut metric_cols = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        metric_cols.push((metric, column(metric.source_header())?));
    }

    let rows = grid[header_idx + 1..]
        .iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| {
            let fields = metric_cols
                .iter()
                .fold(MetricFields::default(), |acc, (metric, col)| {
                    acc.with(*metric, parse_cell(cell(row, *col)))
                });
            Row::new(cell(row, interval_col).trim(), fields)
        })
        .collect();

    Ok(RowTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sample_grid() -> Vec<Vec<String>> {
        vec![
            s(&["Vnitrodenní trh s elektřinou"]),
            s(&["Datum: 01.07.2025"]),
            s(&[]),
            s(&[
                "Perioda",
                "Časový interval",
                "Zobchodované množství\n(MWh)",
                "Zobchodované množství - nákup\n(MWh)",
                "Zobchodované množství - prodej\n(MWh)",
                "Vážený průměr cen  (EUR/MWh)",
                "Minimální cena\n(EUR/MWh)",
                "Maximální cena\n(EUR/MWh)",
                "Poslední cena\n(EUR/MWh)",
            ]),
            s(&["1", "00:00-00:15", "10.5", "5", "5.5", "98.1", "90", "101", "99"]),
            s(&["", "", "", "", "", "", "", "", ""]),
            s(&["2", "00:15-00:30", "8", "4", "4", "95,2", "-", "97", "96"]),
        ]
    }

    #[test]
    fn test_clean_header() {
        assert_eq!(
            clean_header("  Zobchodované množství\n(MWh) "),
            "Zobchodované množství(MWh)"
        );
        assert_eq!(
            clean_header("Vážený průměr cen   (EUR/MWh)"),
            "Vážený průměr cen (EUR/MWh)"
        );
        assert_eq!(clean_header("Časový\ninterval"), "Časovýinterval");
    }

    #[test]
    fn test_table_from_grid() {
        let table = table_from_grid(&sample_grid()).unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.raw_interval, "00:00-00:15");
        assert_eq!(first.fields.get(Metric::TradedVolume), Some(10.5));
        assert_eq!(first.fields.get(Metric::LastPrice), Some(99.0));

        let second = &table.rows()[1];
        assert_eq!(second.fields.get(Metric::WeightedAveragePrice), Some(95.2));
        assert_eq!(second.fields.get(Metric::MinPrice), None);
    }

    #[test]
    fn test_missing_header_row() {
        let grid = vec![s(&["foo", "bar"]), s(&["1", "2"])];
        assert!(matches!(table_from_grid(&grid), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_missing_metric_column() {
        let grid = vec![
            s(&["Časový interval", "Zobchodované množství(MWh)"]),
            s(&["00:00-00:15", "1"]),
        ];
        let err = table_from_grid(&grid).unwrap_err();
        assert!(err.to_string().contains("missing column"));
    }

    #[test]
    fn test_empty_grid() {
        assert!(table_from_grid(&[]).is_err());
    }
}
