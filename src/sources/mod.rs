pub mod cryosphere;
pub mod emissions;
pub mod forcing;
pub mod ghg;
pub mod ocean;
pub mod temperature;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::ClimateError;
use crate::table::{Record, Table, parse_number};

pub(crate) fn long_series(
    table: &Table,
    year_column: &str,
    value_column: &str,
    name: &str,
) -> Result<Vec<Record>, ClimateError> {
    let years = table.numeric(year_column)?;
    let values = table.numeric(value_column)?;
    let mut records: Vec<Record> = years
        .into_iter()
        .zip(values)
        .filter(|(year, _)| !year.is_nan())
        .map(|(year, value)| Record::new(year, name, value))
        .collect();
    records.sort_by(|a, b| a.year.total_cmp(&b.year));
    Ok(records)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatedColumns {
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl DatedColumns {
    pub(crate) fn from_table(
        table: &Table,
        date_column: &str,
        dates: Vec<NaiveDate>,
        missing: Option<f64>,
    ) -> Result<Self, ClimateError> {
        let date_idx = table.column_index(date_column)?;
        let mut columns = BTreeMap::new();
        for (idx, header) in table.headers().iter().enumerate() {
            if idx == date_idx {
                continue;
            }
            let parsed: Option<Vec<f64>> = table
                .rows()
                .iter()
                .map(|row| parse_number(&row[idx]))
                .collect();
            match parsed {
                Some(values) => {
                    let values = values
                        .into_iter()
                        .map(|value| match missing {
                            Some(marker) if value == marker => f64::NAN,
                            _ => value,
                        })
                        .collect();
                    columns.insert(header.clone(), values);
                }
                None => debug!(source = table.source_id(), column = %header, "skipping non-numeric column"),
            }
        }
        Ok(Self { dates, columns })
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YearColumns {
    pub years: Vec<f64>,
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl YearColumns {
    pub(crate) fn from_table(table: &Table, year_column: &str) -> Result<Self, ClimateError> {
        let years = table.numeric(year_column)?;
        let mut columns = BTreeMap::new();
        for header in table.headers() {
            if header != year_column {
                columns.insert(header.clone(), table.numeric(header)?);
            }
        }
        Ok(Self { years, columns })
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}
