use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ClimateError;
use crate::nc::Profile;
use crate::sources::long_series;
use crate::table::{Record, SeriesTable, Table};
use crate::transform::rolling_mean;

/// Berkeley Earth's 1951-1980 global mean, added to its anomalies to give absolute values.
pub const BE_ABSOLUTE_OFFSET: f64 = 14.102;
pub const BEFORE_PRESENT_EPOCH: f64 = 1950.0;
pub const FIVE_YEAR_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalTemperature {
    pub year: f64,
    pub annual: f64,
    pub annual_unc: f64,
    pub five_year: f64,
    pub five_year_unc: f64,
    pub annual_water: f64,
    pub annual_water_unc: f64,
    pub five_year_water: f64,
    pub five_year_water_unc: f64,
}

pub fn be_global_full(table: &Table) -> Result<Vec<GlobalTemperature>, ClimateError> {
    let column = |name: &str| table.numeric(name);
    let absolute = |name: &str| -> Result<Vec<f64>, ClimateError> {
        Ok(column(name)?.into_iter().map(|value| value + BE_ABSOLUTE_OFFSET).collect())
    };

    let years = column("Year")?;
    let annual = absolute("Annual Anomaly")?;
    let annual_unc = column("Annual Unc.")?;
    let five_year = absolute("Five-year Anomaly")?;
    let five_year_unc = column("Five-year Unc.")?;
    let annual_water = absolute("Annual Anomaly(W)")?;
    let annual_water_unc = column("Annual Unc.(W)")?;
    let five_year_water = absolute("Five-year Anomaly(W)")?;
    let five_year_water_unc = column("Five-year Unc.(W)")?;

    let mut rows: Vec<GlobalTemperature> = (0..years.len())
        .filter(|&idx| !years[idx].is_nan())
        .map(|idx| GlobalTemperature {
            year: years[idx],
            annual: annual[idx],
            annual_unc: annual_unc[idx],
            five_year: five_year[idx],
            five_year_unc: five_year_unc[idx],
            annual_water: annual_water[idx],
            annual_water_unc: annual_water_unc[idx],
            five_year_water: five_year_water[idx],
            five_year_water_unc: five_year_water_unc[idx],
        })
        .collect();
    rows.sort_by(|a, b| a.year.total_cmp(&b.year));
    Ok(rows)
}

pub fn be_global_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    let records = be_global_full(table)?
        .into_iter()
        .map(|row| Record::new(row.year, "Temp_latest", row.annual))
        .collect();
    Ok(SeriesTable::new(records))
}

pub fn be_antarctica_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    let years = table.numeric("Year")?;
    let anomalies = table.numeric("Monthly Anomaly")?;

    let mut by_year: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (year, anomaly) in years.into_iter().zip(anomalies) {
        if year.is_nan() {
            continue;
        }
        let months = by_year.entry(year as i64).or_default();
        if !anomaly.is_nan() {
            months.push(anomaly);
        }
    }

    let records = by_year
        .into_iter()
        .map(|(year, months)| {
            let value = if months.len() == 12 {
                months.iter().sum::<f64>() / 12.0
            } else {
                f64::NAN
            };
            Record::new(year as f64, "Temp_antarct_latest", value)
        })
        .collect();
    Ok(SeriesTable::new(records))
}

pub fn instrumental_series(
    table: &Table,
    year_column: &str,
    anomaly_column: &str,
    name: &str,
) -> Result<SeriesTable, ClimateError> {
    let mut annual = long_series(table, year_column, anomaly_column, name)?;
    let values: Vec<f64> = annual.iter().map(|record| record.value).collect();
    let smoothed_name = format!("{name}_5yr");
    let smoothed: Vec<Record> = annual
        .iter()
        .zip(rolling_mean(&values, FIVE_YEAR_WINDOW))
        .map(|(record, value)| Record::new(record.year, smoothed_name.as_str(), value))
        .collect();
    annual.extend(smoothed);
    Ok(SeriesTable::new(annual))
}

pub fn gistemp_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    instrumental_series(table, "Year", "J-D", "Temp_gistemp")
}

pub fn hadcrut_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    instrumental_series(table, "Time", "Anomaly (deg C)", "Temp_hadcrut")
}

pub fn noaa_global_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    instrumental_series(table, "Year", "Anomaly", "Temp_noaa")
}

pub fn parrenin_series(table: &Table) -> Result<SeriesTable, ClimateError> {
    let records = long_series(table, "Year", "Value", "Temp_parrenin")?
        .into_iter()
        .map(|record| Record::new(BEFORE_PRESENT_EPOCH - record.year * 1000.0, record.name, record.value))
        .collect();
    let mut series = SeriesTable::new(records);
    series.sort_by_year();
    Ok(series)
}

pub fn osman_series(profile: &Profile) -> SeriesTable {
    let mut series = SeriesTable::new(
        profile
            .coordinate
            .iter()
            .zip(&profile.values)
            .map(|(age, value)| Record::new(BEFORE_PRESENT_EPOCH - age, "Temp_hist", *value))
            .collect(),
    );
    series.sort_by_year();
    series
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub experiment: String,
    pub quantile: f64,
    pub year: f64,
    pub tas: f64,
}

pub fn cmip6_records(table: &Table) -> Result<Vec<ScenarioRecord>, ClimateError> {
    let experiments = table.text("experiment")?;
    let quantiles = table.numeric("quantile")?;
    let years = table.numeric("year")?;
    let tas = table.numeric("tas")?;
    Ok((0..table.len())
        .map(|idx| ScenarioRecord {
            experiment: experiments[idx].to_string(),
            quantile: quantiles[idx],
            year: years[idx],
            tas: tas[idx],
        })
        .collect())
}
