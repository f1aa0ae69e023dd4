//! Row completeness
//!
//! A row is real data only when every required metric is present. The OTE
//! report publishes rows ahead of time with "-" placeholders, so a row can
//! exist for the current interval before any trade has been recorded.

use crate::models::{Metric, Row};

/// True when at least one required metric is missing.
pub fn is_empty(row: &Row) -> bool {
    Metric::ALL.iter().any(|m| row.fields.get(*m).is_none())
}

pub fn is_complete(row: &Row) -> bool {
    !is_empty(row)
}

pub fn missing_metrics(row: &Row) -> Vec<Metric> {
    Metric::ALL
        .iter()
        .copied()
        .filter(|m| row.fields.get(*m).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricFields;

    #[test]
    fn test_complete_row() {
        let row = Row::new("10:00-10:15", MetricFields::filled(1.0));
        assert!(!is_empty(&row));
        assert!(is_complete(&row));
        assert!(missing_metrics(&row).is_empty());
    }

    #[test]
    fn test_single_sentinel_makes_row_empty() {
        let row = Row::from_cells("10:00-10:15", ["1", "2", "3", "4", "-", "6", "7"]);
        assert!(is_empty(&row));
        assert_eq!(missing_metrics(&row), vec![Metric::MinPrice]);
    }

    #[test]
    fn test_blank_cells_make_row_empty() {
        let row = Row::from_cells("10:00-10:15", ["1", "  ", "3", "4", "5", "6", ""]);
        assert!(is_empty(&row));
        assert_eq!(
            missing_metrics(&row),
            vec![Metric::PurchasedVolume, Metric::LastPrice]
        );
    }

    #[test]
    fn test_zero_is_real_data() {
        let row = Row::new("10:00-10:15", MetricFields::filled(0.0));
        assert!(is_complete(&row));
    }
}
