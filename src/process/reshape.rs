use crate::process::normalize::DatasetKind;
use crate::process::raw_table::{RawTable, RowAnomaly};
use crate::process::utils::clean_str;
use tracing::{debug, info};

/// Header aliases for the month-label column of the published statistics.
const MONTH_LABEL_ALIASES: &[&str] = &["landingsmåned", "måned", "month"];

pub const LONG_HEADERS: [&str; 3] = ["year", "month", "rundvekt"];

fn is_year_header(name: &str) -> bool {
    let name = clean_str(name);
    name.len() == 4 && name.chars().all(|c| c.is_ascii_digit())
}

/// True when `table` is laid out as one month-label column plus one column per
/// year, with no per-row weight column.
pub fn is_wide(table: &RawTable) -> bool {
    let has_weight = DatasetKind::ALL
        .iter()
        .any(|kind| kind.profile().weight_column(table).is_some());
    !has_weight
        && table.find_column(MONTH_LABEL_ALIASES).is_some()
        && table.headers.iter().any(|h| is_year_header(h))
}

/// Melt a wide statistics table into `year, month, rundvekt` rows.
/// Long tables are returned unchanged.
///
/// Each (row, year column) cell becomes one output row, so row-level
/// accounting downstream is per cell. Anomalies of a source row are carried
/// over to every cell it produced.
pub fn to_long(table: RawTable) -> RawTable {
    if !is_wide(&table) {
        return table;
    }
    let Some(month_idx) = table.find_column(MONTH_LABEL_ALIASES) else {
        return table;
    };
    let year_cols: Vec<(usize, String)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_year_header(h))
        .map(|(i, h)| (i, clean_str(h)))
        .collect();

    let mut long = RawTable {
        headers: LONG_HEADERS.iter().map(|s| s.to_string()).collect(),
        rows: Vec::with_capacity(table.rows.len() * year_cols.len()),
        anomalies: Vec::new(),
    };

    for (row_idx, row) in table.rows.iter().enumerate() {
        let anomaly = table.anomalies.iter().find(|a| a.row == row_idx);
        for (col, year) in &year_cols {
            if let Some(a) = anomaly {
                long.anomalies.push(RowAnomaly {
                    row: long.rows.len(),
                    ..a.clone()
                });
            }
            long.rows.push(vec![year.clone(), row[month_idx].clone(), row[*col].clone()]);
        }
    }

    info!(
        months = table.rows.len(),
        years = year_cols.len(),
        cells = long.rows.len(),
        "melted wide table"
    );
    debug!(headers = ?table.headers, "wide headers");
    long
}
