/// Header text of the interval column in the published spreadsheet.
pub const INTERVAL_HEADER: &str = "Časový interval";

/// Required numeric metrics of an intraday trading interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    TradedVolume,
    PurchasedVolume,
    SoldVolume,
    WeightedAveragePrice,
    MinPrice,
    MaxPrice,
    LastPrice,
}

impl Metric {
    /// All required metrics, in served column order.
    pub const ALL: [Metric; 7] = [
        Metric::TradedVolume,
        Metric::PurchasedVolume,
        Metric::SoldVolume,
        Metric::WeightedAveragePrice,
        Metric::MinPrice,
        Metric::MaxPrice,
        Metric::LastPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::TradedVolume => "traded_volume",
            Metric::PurchasedVolume => "purchased_volume",
            Metric::SoldVolume => "sold_volume",
            Metric::WeightedAveragePrice => "weighted_average_price",
            Metric::MinPrice => "min_price",
            Metric::MaxPrice => "max_price",
            Metric::LastPrice => "last_price",
        }
    }

    /// Column header used by the OTE intraday report.
    pub fn source_header(&self) -> &'static str {
        match self {
            Metric::TradedVolume => "Zobchodované množství(MWh)",
            Metric::PurchasedVolume => "Zobchodované množství - nákup(MWh)",
            Metric::SoldVolume => "Zobchodované množství - prodej(MWh)",
            Metric::WeightedAveragePrice => "Vážený průměr cen (EUR/MWh)",
            Metric::MinPrice => "Minimální cena(EUR/MWh)",
            Metric::MaxPrice => "Maximální cena(EUR/MWh)",
            Metric::LastPrice => "Poslední cena(EUR/MWh)",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric fields of one interval row. `None` means the source cell was
/// absent, blank, the "-" placeholder, or otherwise not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricFields {
    pub traded_volume: Option<f64>,
    pub purchased_volume: Option<f64>,
    pub sold_volume: Option<f64>,
    pub weighted_average_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub last_price: Option<f64>,
}

impl MetricFields {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::TradedVolume => self.traded_volume,
            Metric::PurchasedVolume => self.purchased_volume,
            Metric::SoldVolume => self.sold_volume,
            Metric::WeightedAveragePrice => self.weighted_average_price,
            Metric::MinPrice => self.min_price,
            Metric::MaxPrice => self.max_price,
            Metric::LastPrice => self.last_price,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::TradedVolume => &mut self.traded_volume,
            Metric::PurchasedVolume => &mut self.purchased_volume,
            Metric::SoldVolume => &mut self.sold_volume,
            Metric::WeightedAveragePrice => &mut self.weighted_average_price,
            Metric::MinPrice => &mut self.min_price,
            Metric::MaxPrice => &mut self.max_price,
            Metric::LastPrice => &mut self.last_price,
        };
        *slot = value;
    }

    pub fn with(mut self, metric: Metric, value: Option<f64>) -> Self {
        self.set(metric, value);
        self
    }

    /// Every metric set to the same value. Handy for fixtures.
    pub fn filled(value: f64) -> Self {
        Metric::ALL
            .iter()
            .fold(Self::default(), |acc, m| acc.with(*m, Some(value)))
    }
}

/// One trading-interval row as read from the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub raw_interval: String,
    pub fields: MetricFields,
}

impl Row {
    pub fn new(raw_interval: impl Into<String>, fields: MetricFields) -> Self {
        Self {
            raw_interval: raw_interval.into(),
            fields,
        }
    }

    /// Builds a row from raw cell text, one cell per metric in `Metric::ALL` order.
    pub fn from_cells(raw_interval: impl Into<String>, cells: [&str; 7]) -> Self {
        let fields = Metric::ALL
            .iter()
            .zip(cells.iter())
            .fold(MetricFields::default(), |acc, (m, cell)| {
                acc.with(*m, parse_cell(cell))
            });
        Self::new(raw_interval, fields)
    }
}

/// Rows in source document order. Rebuilt from scratch on every fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTable {
    rows: Vec<Row>,
}

impl RowTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, position: usize) -> Option<&Row> {
        self.rows.get(position)
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parses one numeric spreadsheet cell.
///
/// Blank cells and the "-" placeholder are missing. Czech formatting
/// (decimal comma, space or NBSP thousands separators) is accepted.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_placeholders() {
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("   "), None);
        assert_eq!(parse_cell("-"), None);
        assert_eq!(parse_cell(" - "), None);
        assert_eq!(parse_cell("n/a"), None);
    }

    #[test]
    fn test_parse_cell_numbers() {
        assert_eq!(parse_cell("12.5"), Some(12.5));
        assert_eq!(parse_cell(" 12,5 "), Some(12.5));
        assert_eq!(parse_cell("1 234,75"), Some(1234.75));
        assert_eq!(parse_cell("1\u{a0}234"), Some(1234.0));
        assert_eq!(parse_cell("-3.2"), Some(-3.2));
    }

    #[test]
    fn test_from_cells_maps_metrics_in_order() {
        let row = Row::from_cells("10:00-10:15", ["1", "2", "3", "4", "5", "6", "-"]);
        assert_eq!(row.fields.get(Metric::TradedVolume), Some(1.0));
        assert_eq!(row.fields.get(Metric::MaxPrice), Some(6.0));
        assert_eq!(row.fields.get(Metric::LastPrice), None);
    }

    #[test]
    fn test_filled_sets_every_metric() {
        let fields = MetricFields::filled(42.0);
        for metric in Metric::ALL {
            assert_eq!(fields.get(metric), Some(42.0));
        }
    }
}
