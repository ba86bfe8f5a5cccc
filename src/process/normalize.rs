//! Mapping of source-specific columns onto the canonical landing record.
//!
//! Each [`DatasetKind`] owns a static [`NormalizationProfile`]: ordered alias
//! lists for the date, year, month and weight columns. Header names are
//! compared after [`header_key`](crate::process::utils::header_key) folding,
//! and the first alias found in the header wins.

use crate::process::date_parser::{parse_month, parse_year, parse_year_month};
use crate::process::raw_table::RawTable;
use crate::process::utils::parse_number;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Domestic,
    Foreign,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Domestic, DatasetKind::Foreign];

    pub fn profile(&self) -> &'static NormalizationProfile {
        match self {
            DatasetKind::Domestic => &DOMESTIC,
            DatasetKind::Foreign => &FOREIGN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Domestic => "domestic",
            DatasetKind::Foreign => "foreign",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weight column alias and the factor that turns its unit into tonnes.
#[derive(Debug, Clone, Copy)]
pub struct WeightAlias {
    pub name: &'static str,
    pub to_tonnes: f64,
}

const fn tonnes(name: &'static str) -> WeightAlias {
    WeightAlias {
        name,
        to_tonnes: 1.0,
    }
}

const fn kilograms(name: &'static str) -> WeightAlias {
    WeightAlias {
        name,
        to_tonnes: 0.001,
    }
}

#[derive(Debug)]
pub struct NormalizationProfile {
    pub date: &'static [&'static str],
    pub year: &'static [&'static str],
    pub month: &'static [&'static str],
    pub weight: &'static [WeightAlias],
    /// Document type column; sluttseddel rows carry code `0`.
    pub document_type: &'static [&'static str],
    /// Number locale of the weight cells.
    pub parse_weight: fn(&str) -> Option<f64>,
}

impl NormalizationProfile {
    /// Resolved weight column index and its unit factor.
    pub fn weight_column(&self, table: &RawTable) -> Option<(usize, f64)> {
        self.weight.iter().find_map(|alias| {
            table
                .find_column(&[alias.name])
                .map(|idx| (idx, alias.to_tonnes))
        })
    }
}

static DOMESTIC: NormalizationProfile = NormalizationProfile {
    date: &[
        "date",
        "landingsdato",
        "landings_dato",
        "landingsdato (yyyy-mm-dd)",
        "dato",
    ],
    year: &["year", "år", "landingsår", "fangstår", "aar"],
    month: &["month", "måned", "landingsmåned", "maaned"],
    weight: &[
        tonnes("rundvekt"),
        tonnes("kvantum_rundvekt"),
        tonnes("kvantum (rundvekt)"),
        tonnes("rundvekt (tonn)"),
        tonnes("rundvekt_tonn"),
        tonnes("weight"),
    ],
    document_type: &[
        "dokumenttype (kode)",
        "dokumenttype",
        "dokument_type",
        "dokument type",
    ],
    parse_weight: parse_number,
};

static FOREIGN: NormalizationProfile = NormalizationProfile {
    date: &[
        "date",
        "landingsdato",
        "landings_dato",
        "landingsdato (yyyy-mm-dd)",
        "landing_date",
        "dato",
    ],
    year: &["year", "år", "landingsår", "aar"],
    month: &["month", "måned", "landingsmåned", "maaned"],
    weight: &[
        tonnes("rundvekt"),
        tonnes("kvantum_rundvekt"),
        tonnes("kvantum (rundvekt)"),
        tonnes("rundvekt (tonn)"),
        tonnes("rundvekt_tonn"),
        kilograms("qty_kg"),
        kilograms("quantity_kg"),
        tonnes("weight"),
    ],
    document_type: &[],
    parse_weight: parse_number,
};

/// One cleaned landing row.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub year: i32,
    pub month: u32,
    pub weight_tonnes: f64,
    pub source_dataset: DatasetKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MissingDate,
    InvalidDate,
    MissingWeight,
    InvalidWeight,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureReason::MissingDate => "missing date",
            FailureReason::InvalidDate => "invalid date",
            FailureReason::MissingWeight => "missing weight",
            FailureReason::InvalidWeight => "invalid weight",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    /// Keep only sluttseddel rows (document type `0`) when the table has a
    /// document type column.
    pub sluttseddel_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub records: Vec<CanonicalRecord>,
    pub failure_count: usize,
    pub failures: BTreeMap<FailureReason, usize>,
    /// Rows dropped by the sluttseddel filter.
    pub skipped: usize,
}

impl Normalized {
    fn fail(&mut self, reason: FailureReason) {
        self.failure_count += 1;
        *self.failures.entry(reason).or_default() += 1;
    }
}

/// Column positions resolved once per table.
struct Columns {
    date: Option<usize>,
    year: Option<usize>,
    month: Option<usize>,
    weight: Option<(usize, f64)>,
    document_type: Option<usize>,
    parse_weight: fn(&str) -> Option<f64>,
}

impl Columns {
    fn resolve(table: &RawTable, profile: &NormalizationProfile) -> Self {
        Columns {
            date: table.find_column(profile.date),
            year: table.find_column(profile.year),
            month: table.find_column(profile.month),
            weight: profile.weight_column(table),
            document_type: table.find_column(profile.document_type),
            parse_weight: profile.parse_weight,
        }
    }
}

pub fn normalize(table: &RawTable, kind: DatasetKind) -> Normalized {
    normalize_with(table, kind, &NormalizeOptions::default())
}

#[instrument(level = "info", skip(table, kind, options), fields(kind = %kind, rows = table.len()))]
pub fn normalize_with(table: &RawTable, kind: DatasetKind, options: &NormalizeOptions) -> Normalized {
    let cols = Columns::resolve(table, kind.profile());
    debug!(
        date = ?cols.date,
        year = ?cols.year,
        month = ?cols.month,
        weight = ?cols.weight,
        document_type = ?cols.document_type,
        "resolved columns"
    );
    if cols.date.is_none() && (cols.year.is_none() || cols.month.is_none()) {
        warn!(headers = ?table.headers, "no date or year/month columns recognised");
    }
    if cols.weight.is_none() {
        warn!(headers = ?table.headers, "no weight column recognised");
    }

    let mut out = Normalized {
        records: Vec::with_capacity(table.len()),
        ..Normalized::default()
    };

    for row in &table.rows {
        if options.sluttseddel_only {
            if let Some(idx) = cols.document_type {
                if row[idx].trim() != "0" {
                    out.skipped += 1;
                    continue;
                }
            }
        }

        let (year, month) = match row_period(row, &cols) {
            Ok(ym) => ym,
            Err(reason) => {
                out.fail(reason);
                continue;
            }
        };

        let weight_tonnes = match row_weight(row, &cols) {
            Ok(w) => w,
            Err(reason) => {
                out.fail(reason);
                continue;
            }
        };

        out.records.push(CanonicalRecord {
            year,
            month,
            weight_tonnes,
            source_dataset: kind,
        });
    }

    info!(
        records = out.records.len(),
        failures = out.failure_count,
        skipped = out.skipped,
        "normalized"
    );
    out
}

fn cell(row: &[String], idx: Option<usize>) -> Option<&str> {
    idx.map(|i| row[i].trim()).filter(|s| !s.is_empty())
}

/// A non-empty combined date governs the row; separate columns are only
/// consulted when it is absent.
fn row_period(row: &[String], cols: &Columns) -> Result<(i32, u32), FailureReason> {
    if let Some(raw) = cell(row, cols.date) {
        return parse_year_month(raw).ok_or(FailureReason::InvalidDate);
    }
    match (cell(row, cols.year), cell(row, cols.month)) {
        (Some(y), Some(m)) => match (parse_year(y), parse_month(m)) {
            (Some(year), Some(month)) => Ok((year, month)),
            _ => Err(FailureReason::InvalidDate),
        },
        _ => Err(FailureReason::MissingDate),
    }
}

fn row_weight(row: &[String], cols: &Columns) -> Result<f64, FailureReason> {
    let (idx, to_tonnes) = cols.weight.ok_or(FailureReason::MissingWeight)?;
    let raw = cell(row, Some(idx)).ok_or(FailureReason::MissingWeight)?;
    let value = (cols.parse_weight)(raw).ok_or(FailureReason::InvalidWeight)?;
    if value < 0.0 {
        return Err(FailureReason::InvalidWeight);
    }
    // 0.0 * factor stays 0.0, and "-0" becomes a plain zero
    Ok((value * to_tonnes).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            anomalies: vec![],
        }
    }

    #[test]
    fn comma_decimals_and_bad_weight() {
        let t = table(
            &["date", "weight"],
            &[&["2023-01", "10,5"], &["2023-01", "4,5"], &["2023-02", "bad"]],
        );
        let n = normalize(&t, DatasetKind::Domestic);
        assert_eq!(n.records.len(), 2);
        assert_eq!(n.failure_count, 1);
        assert_eq!(n.failures.get(&FailureReason::InvalidWeight), Some(&1));
        assert_eq!(n.records[0].weight_tonnes, 10.5);
        assert_eq!(n.records[1].weight_tonnes, 4.5);
        assert!(n.records.iter().all(|r| (r.year, r.month) == (2023, 1)));
    }

    #[test]
    fn header_variants_are_folded() {
        let t = table(
            &["  LANDINGSDATO ", "Kvantum  (Rundvekt)"],
            &[&["2022-06-15", "3"]],
        );
        let n = normalize(&t, DatasetKind::Domestic);
        assert_eq!(
            n.records,
            vec![CanonicalRecord {
                year: 2022,
                month: 6,
                weight_tonnes: 3.0,
                source_dataset: DatasetKind::Domestic
            }]
        );
    }

    #[test]
    fn separate_year_and_month_columns() {
        let t = table(
            &["År", "Måned", "Rundvekt"],
            &[&["2021", "Mars", "1"], &["2021", "12", "2"], &["2021", "13", "3"]],
        );
        let n = normalize(&t, DatasetKind::Foreign);
        let periods: Vec<(i32, u32)> = n.records.iter().map(|r| (r.year, r.month)).collect();
        assert_eq!(periods, vec![(2021, 3), (2021, 12)]);
        assert_eq!(n.failures.get(&FailureReason::InvalidDate), Some(&1));
    }

    #[test]
    fn combined_date_takes_precedence() {
        let t = table(
            &["year", "month", "date", "rundvekt"],
            &[&["2020", "1", "2023-07-04", "1"], &["2020", "1", "", "1"]],
        );
        let n = normalize(&t, DatasetKind::Domestic);
        assert_eq!((n.records[0].year, n.records[0].month), (2023, 7));
        assert_eq!((n.records[1].year, n.records[1].month), (2020, 1));
    }

    #[test]
    fn bad_combined_date_is_not_papered_over() {
        let t = table(
            &["year", "month", "date", "rundvekt"],
            &[&["2020", "1", "not a date", "1"]],
        );
        let n = normalize(&t, DatasetKind::Domestic);
        assert!(n.records.is_empty());
        assert_eq!(n.failures.get(&FailureReason::InvalidDate), Some(&1));
    }

    #[test]
    fn kilogram_aliases_are_scaled_for_foreign_only() {
        let t = table(&["date", "qty_kg"], &[&["2023-05-01", "2 500"]]);
        let foreign = normalize(&t, DatasetKind::Foreign);
        assert_eq!(foreign.records[0].weight_tonnes, 2.5);

        let domestic = normalize(&t, DatasetKind::Domestic);
        assert!(domestic.records.is_empty());
        assert_eq!(domestic.failures.get(&FailureReason::MissingWeight), Some(&1));
    }

    #[test]
    fn missing_cells_and_negative_weights_fail() {
        let t = table(
            &["date", "rundvekt"],
            &[&["", "1"], &["2023-01-01", ""], &["2023-01-01", "-3"]],
        );
        let n = normalize(&t, DatasetKind::Domestic);
        assert!(n.records.is_empty());
        assert_eq!(n.failure_count, 3);
        assert_eq!(n.failures.get(&FailureReason::MissingDate), Some(&1));
        assert_eq!(n.failures.get(&FailureReason::MissingWeight), Some(&1));
        assert_eq!(n.failures.get(&FailureReason::InvalidWeight), Some(&1));
    }

    #[test]
    fn sluttseddel_filter_is_opt_in_and_accounted() {
        let t = table(
            &["Dokumenttype (kode)", "landingsdato", "rundvekt"],
            &[
                &["0", "2023-01-01", "1"],
                &["1", "2023-01-01", "1"],
                &["0", "2023-01-01", "x"],
            ],
        );
        let all = normalize(&t, DatasetKind::Domestic);
        assert_eq!((all.records.len(), all.failure_count, all.skipped), (2, 1, 0));

        let opts = NormalizeOptions {
            sluttseddel_only: true,
        };
        let filtered = normalize_with(&t, DatasetKind::Domestic, &opts);
        assert_eq!(
            (filtered.records.len(), filtered.failure_count, filtered.skipped),
            (1, 1, 1)
        );
        assert_eq!(
            filtered.records.len() + filtered.failure_count + filtered.skipped,
            t.len()
        );
    }

    #[test]
    fn unknown_layout_fails_every_row() {
        let t = table(&["art", "fartøy"], &[&["torsk", "X"], &["sei", "Y"]]);
        let n = normalize(&t, DatasetKind::Domestic);
        assert!(n.records.is_empty());
        assert_eq!(n.failure_count, 2);
    }

    #[test]
    fn weights_go_through_the_profile_number_locale() {
        let t = table(
            &["date", "rundvekt"],
            &[&["2023-01", "1.234,5"], &["2023-01", "1 000"], &["2023-01", "1,5,5"]],
        );
        for kind in DatasetKind::ALL {
            let parse = kind.profile().parse_weight;
            assert_eq!(parse("1.234,5"), Some(1234.5));
            let n = normalize(&t, kind);
            let weights: Vec<f64> = n.records.iter().map(|r| r.weight_tonnes).collect();
            assert_eq!(weights, vec![1234.5, 1000.0, 155.0]);
        }
    }

    #[test]
    fn output_is_reproducible() {
        let t = table(
            &["date", "rundvekt"],
            &[&["2023-02-01", "1,25"], &["2023-01-01", "2"], &["2022-12-31", "x"]],
        );
        assert_eq!(
            normalize(&t, DatasetKind::Foreign),
            normalize(&t, DatasetKind::Foreign)
        );
    }
}
