use anyhow::ensure;

/// Which axis carries the reporting periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Metric rows over period columns, newest period first (statements).
    PeriodColumns,
    /// Period rows over metric columns, newest period first (analyst trends).
    PeriodRows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// An immutable table of named rows over named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialTable {
    layout: TableLayout,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl FinancialTable {
    pub fn empty(layout: TableLayout) -> Self {
        Self {
            layout,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(layout: TableLayout, columns: Vec<String>, rows: Vec<TableRow>) -> anyhow::Result<Self> {
        for row in &rows {
            ensure!(
                row.values.len() == columns.len(),
                "row {:?} has {} values but the table has {} columns",
                row.label,
                row.values.len(),
                columns.len()
            );
        }
        Ok(Self {
            layout,
            columns,
            rows,
        })
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.label == row)
            .and_then(|r| r.values.get(col).copied().flatten())
    }

    /// The most recent period's value for every metric, in table order.
    pub fn latest(&self) -> Vec<(&str, Option<f64>)> {
        if self.is_empty() {
            return Vec::new();
        }
        match self.layout {
            TableLayout::PeriodColumns => self
                .rows
                .iter()
                .map(|row| (row.label.as_str(), row.values.first().copied().flatten()))
                .collect(),
            TableLayout::PeriodRows => {
                let newest = &self.rows[0];
                self.columns
                    .iter()
                    .zip(&newest.values)
                    .map(|(col, v)| (col.as_str(), *v))
                    .collect()
            }
        }
    }

    /// Label of the most recent period, if any.
    pub fn latest_period(&self) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        match self.layout {
            TableLayout::PeriodColumns => self.columns.first().map(String::as_str),
            TableLayout::PeriodRows => self.rows.first().map(|r| r.label.as_str()),
        }
    }
}

/// Formats a cell the way tabular dumps do: integers without a fraction,
/// missing values as `NaN`.
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        None => "NaN".to_string(),
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
        Some(v) => format!("{v}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement() -> FinancialTable {
        FinancialTable::new(
            TableLayout::PeriodColumns,
            vec!["2024-09-30".to_string(), "2023-09-30".to_string()],
            vec![
                TableRow {
                    label: "totalRevenue".to_string(),
                    values: vec![Some(391_035.0), Some(383_285.0)],
                },
                TableRow {
                    label: "netIncome".to_string(),
                    values: vec![None, Some(96_995.0)],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_rows() {
        let res = FinancialTable::new(
            TableLayout::PeriodColumns,
            vec!["2024".to_string()],
            vec![TableRow {
                label: "x".to_string(),
                values: vec![Some(1.0), Some(2.0)],
            }],
        );
        assert!(res.is_err());
    }

    #[test]
    fn rejects_rows_shorter_than_the_period_columns() {
        let err = FinancialTable::new(
            TableLayout::PeriodColumns,
            vec!["2024".to_string(), "2023".to_string()],
            vec![TableRow {
                label: "totalRevenue".to_string(),
                values: vec![Some(1.0)],
            }],
        )
        .unwrap_err();
        assert!(err.to_string().contains("has 1 values but the table has 2 columns"));
    }

    #[test]
    fn latest_takes_first_period_column() {
        let table = statement();
        assert_eq!(table.latest_period(), Some("2024-09-30"));
        assert_eq!(
            table.latest(),
            vec![("totalRevenue", Some(391_035.0)), ("netIncome", None)]
        );
    }

    #[test]
    fn latest_takes_first_period_row() {
        let table = FinancialTable::new(
            TableLayout::PeriodRows,
            vec!["buy".to_string(), "hold".to_string()],
            vec![
                TableRow {
                    label: "0m".to_string(),
                    values: vec![Some(20.0), Some(8.0)],
                },
                TableRow {
                    label: "-1m".to_string(),
                    values: vec![Some(18.0), Some(9.0)],
                },
            ],
        )
        .unwrap();
        assert_eq!(table.latest_period(), Some("0m"));
        assert_eq!(table.latest(), vec![("buy", Some(20.0)), ("hold", Some(8.0))]);
    }

    #[test]
    fn value_lookup_handles_missing_cells() {
        let table = statement();
        assert_eq!(table.value("totalRevenue", "2023-09-30"), Some(383_285.0));
        assert_eq!(table.value("netIncome", "2024-09-30"), None);
        assert_eq!(table.value("grossProfit", "2024-09-30"), None);
    }

    #[test]
    fn empty_table_has_no_latest() {
        let table = FinancialTable::empty(TableLayout::PeriodColumns);
        assert!(table.is_empty());
        assert!(table.latest().is_empty());
        assert_eq!(table.latest_period(), None);
    }

    #[test]
    fn formats_cells() {
        assert_eq!(format_cell(None), "NaN");
        assert_eq!(format_cell(Some(1200.0)), "1200");
        assert_eq!(format_cell(Some(-0.25)), "-0.25");
    }
}
