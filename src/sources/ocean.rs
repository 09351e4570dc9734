use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{fractional_year_to_date, integer_to_date, parse_date};
use crate::error::ClimateError;
use crate::sources::DatedColumns;
use crate::table::Table;
use crate::transform::gradient;

pub const PROJECTION_SCENARIOS: [&str; 3] = ["ssp126", "ssp245", "ssp585"];
pub const PROJECTION_CONFIDENCE: &str = "medium";
pub const ALOHA_MISSING: f64 = -999.0;
const CM_TO_MM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaLevelRecord {
    pub year: i32,
    pub value: f64,
    pub unc: f64,
}

pub fn sea_level_hist(table: &Table) -> Result<Vec<SeaLevelRecord>, ClimateError> {
    let years = table.numeric("Year")?;
    let values = table.numeric("Value")?;
    let uncs = table.numeric("Unc")?;
    Ok((0..years.len())
        .filter(|&idx| !years[idx].is_nan())
        .map(|idx| SeaLevelRecord {
            year: (years[idx] - 0.5).trunc() as i32,
            value: values[idx],
            unc: uncs[idx],
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaLevelObservation {
    pub time: f64,
    pub date: NaiveDate,
    pub mean_sea_level_cm: f64,
    pub uncertainty_cm: f64,
    pub ols_fit_cm: f64,
    pub trend_slope: f64,
}

pub fn sea_level_latest(table: &Table) -> Result<Vec<SeaLevelObservation>, ClimateError> {
    let times = table.numeric("Time (years)")?;
    let levels = table.numeric("Mean Sea Level (cm)")?;
    let uncertainties = table.numeric("90% C.L. uncertainty")?;
    let ols = table.numeric("OLS fit")?;

    let ols_mm: Vec<f64> = ols.iter().map(|value| value * CM_TO_MM).collect();
    let slopes = gradient(&ols_mm, &times)?;

    (0..times.len())
        .map(|idx| {
            Ok(SeaLevelObservation {
                time: times[idx],
                date: fractional_year_to_date(times[idx])?,
                mean_sea_level_cm: levels[idx],
                uncertainty_cm: uncertainties[idx],
                ols_fit_cm: ols[idx],
                trend_slope: slopes[idx],
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRecord {
    pub scenario: String,
    pub quantile: f64,
    pub year: i32,
    pub level: f64,
}

pub fn sea_level_projection(table: &Table) -> Result<Vec<ProjectionRecord>, ClimateError> {
    let confidence = table.text("confidence")?;
    let scenarios = table.text("scenario")?;
    let quantiles = table.numeric("quantile")?;
    let keep: Vec<usize> = (0..table.len())
        .filter(|&idx| confidence[idx] == PROJECTION_CONFIDENCE && PROJECTION_SCENARIOS.contains(&scenarios[idx]))
        .collect();

    let mut records = Vec::new();
    for year in (2020..=2150).step_by(10) {
        let levels = table.numeric(&year.to_string())?;
        records.extend(keep.iter().map(|&idx| ProjectionRecord {
            scenario: scenarios[idx].to_string(),
            quantile: quantiles[idx],
            year,
            level: levels[idx],
        }));
    }
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub uncertainty: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhData {
    pub global: Vec<PhRecord>,
    pub aloha: DatedColumns,
}

pub fn ph_global(table: &Table) -> Result<Vec<PhRecord>, ClimateError> {
    let dates = table.text("date")?;
    let values = table.numeric("value")?;
    let uncertainties = table.numeric("uncertainty")?;
    (0..table.len())
        .map(|idx| {
            Ok(PhRecord {
                date: parse_date(dates[idx])?,
                value: values[idx],
                uncertainty: uncertainties[idx],
            })
        })
        .collect()
}

pub fn ph_aloha(table: &Table) -> Result<DatedColumns, ClimateError> {
    let dates = table
        .text("date")?
        .into_iter()
        .map(parse_date)
        .collect::<Result<Vec<_>, _>>()?;
    DatedColumns::from_table(table, "date", dates, Some(ALOHA_MISSING))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OceanHeatLayer {
    pub layer: String,
    pub data: DatedColumns,
}

pub const OCEAN_HEAT_LAYERS: [&str; 4] = ["0-300 m", "0-700 m", "0-2000 m", "700-2000 m"];

/// NOAA ocean heat content; `time` is packed as `YYYYMMDD` with a zero-based month.
pub fn ocean_heat_layer(layer: &str, table: &Table) -> Result<OceanHeatLayer, ClimateError> {
    let dates = table
        .numeric("time")?
        .into_iter()
        .map(|packed| integer_to_date(packed as i64))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(OceanHeatLayer {
        layer: layer.to_string(),
        data: DatedColumns::from_table(table, "time", dates, None)?,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::parse::{ParseOptions, parse_text};

    #[test]
    fn sea_level_hist_moves_mid_year() {
        let options = ParseOptions::whitespace().with_names(&["Year", "Value", "Unc"]);
        let table = parse_text("sea_level_hist", "1880.5 -158.7 24.2\n1881.5 -153.1 24.2\n", &options).unwrap();
        let records = sea_level_hist(&table).unwrap();
        assert_eq!(records[0].year, 1880);
        assert_eq!(records[1].year, 1881);
    }

    #[test]
    fn sea_level_latest_slope_is_mm_per_year() {
        let mut text = String::from("Time (years),Mean Sea Level (cm),90% C.L. uncertainty,OLS fit\n");
        for step in 0..5 {
            let time = 1993.0 + step as f64 * 0.25;
            let fit = 0.33 * (time - 1993.0);
            text.push_str(&format!("{time},{fit},0.4,{fit}\n"));
        }
        let table = parse_text("sea_level_latest", &text, &ParseOptions::csv()).unwrap();
        let observations = sea_level_latest(&table).unwrap();
        assert_eq!(observations.len(), 5);
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(1993, 1, 1).unwrap());
        for obs in &observations {
            assert!((obs.trend_slope - 3.3).abs() < 1e-6);
        }
    }

    #[test]
    fn projections_filter_and_melt() {
        let years: Vec<String> = (2020..=2150).step_by(10).map(|year| year.to_string()).collect();
        let mut text = format!("confidence,scenario,quantile,{}\n", years.join(","));
        let levels = |base: f64| {
            (0..years.len())
                .map(|idx| (base + idx as f64).to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        text.push_str(&format!("medium,ssp245,50,{}\n", levels(0.0)));
        text.push_str(&format!("low,ssp245,50,{}\n", levels(100.0)));
        text.push_str(&format!("medium,ssp370,50,{}\n", levels(200.0)));
        let table = parse_text("sea_level_projection", &text, &ParseOptions::csv()).unwrap();

        let records = sea_level_projection(&table).unwrap();
        assert_eq!(records.len(), 14);
        assert!(records.iter().all(|record| record.scenario == "ssp245"));
        assert_eq!(records[13].year, 2150);
        assert_eq!(records[13].level, 13.0);
    }

    #[test]
    fn ocean_heat_dates_use_zero_based_month() {
        let text = "time,global_ohc300m\n20050615,8.1\n";
        let table = parse_text("ohc_300", text, &ParseOptions::csv()).unwrap();
        let layer = ocean_heat_layer("0-300 m", &table).unwrap();
        assert_eq!(layer.data.dates, vec![NaiveDate::from_ymd_opt(2005, 7, 15).unwrap()]);
        assert_eq!(layer.data.column("global_ohc300m"), Some(&[8.1][..]));
    }

    #[test]
    fn ph_global_rejects_bad_dates() {
        let table = parse_text("ph_hist", "date,value,uncertainty\nyesterday,8.1,0.01\n", &ParseOptions::csv()).unwrap();
        assert_matches!(ph_global(&table), Err(ClimateError::InvalidDate(_)));
    }
}
