use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::calendar::{fractional_year_to_date, month_range, month_start, season_of};
use crate::domain::{Hemisphere, Season};
use crate::error::ClimateError;
use crate::table::Table;
use crate::transform::{Trend, interpolate_linear, rolling_mean, trendline};

pub const SEA_ICE_MISSING: f64 = -9999.0;
pub const SEA_ICE_WINDOW: usize = 12;
pub const ICE_SHEET_GAP_SOURCES: [&str; 2] = [
    "NASA - Antarctica land ice mass",
    "NASA - Greenland land ice mass",
];
pub const ICE_SHEET_GAP_YEAR: f64 = 2018.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonValue {
    pub year: i32,
    pub season: Season,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnowAggregates {
    pub seasons: Vec<SeasonValue>,
    pub years: Vec<YearValue>,
}

/// A season has a value only when all three of its months do, a year only when all
/// twelve do. Months absent from the file count as missing.
pub fn snow_aggregates(table: &Table) -> Result<SnowAggregates, ClimateError> {
    let years = table.numeric("year")?;
    let months = table.numeric("month")?;
    let values = table.numeric("value")?;

    let mut observed: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for ((year, month), value) in years.into_iter().zip(months).zip(values) {
        if year.is_nan() || month.is_nan() {
            continue;
        }
        let date = month_start(year as i32, month as u32)?;
        if let Some(previous) = observed.insert(date, value) {
            debug!(%date, previous, value, "duplicate snow cover month; keeping the later row");
        }
    }

    let (Some(first), Some(last)) = (observed.keys().next(), observed.keys().next_back()) else {
        return Ok(SnowAggregates::default());
    };

    let mut seasons: BTreeMap<(i32, Season), Vec<f64>> = BTreeMap::new();
    let mut calendar_years: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for date in month_range(*first, *last) {
        let value = observed.get(&date).copied().unwrap_or(f64::NAN);
        let (season, season_year) = season_of(date);
        let season_values = seasons.entry((season_year, season)).or_default();
        let year_values = calendar_years.entry(date.year()).or_default();
        if !value.is_nan() {
            season_values.push(value);
            year_values.push(value);
        }
    }

    Ok(SnowAggregates {
        seasons: seasons
            .into_iter()
            .map(|((year, season), values)| SeasonValue {
                year,
                season,
                value: complete_mean(&values, 3),
            })
            .collect(),
        years: calendar_years
            .into_iter()
            .map(|(year, values)| YearValue {
                year,
                value: complete_mean(&values, 12),
            })
            .collect(),
    })
}

fn complete_mean(values: &[f64], expected: usize) -> Option<f64> {
    (values.len() == expected).then(|| values.iter().sum::<f64>() / expected as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IceSheetRecord {
    pub year: f64,
    pub date: NaiveDate,
    pub source: String,
    pub value: f64,
}

pub fn ice_sheet_records(table: &Table) -> Result<Vec<IceSheetRecord>, ClimateError> {
    let years = table.numeric("Year")?;
    let dates = years
        .iter()
        .map(|year| fractional_year_to_date(*year))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::new();
    for source in table.headers().iter().filter(|header| *header != "Year") {
        let values = table.numeric(source)?;
        records.extend(
            years
                .iter()
                .zip(&dates)
                .zip(values)
                .filter(|(_, value)| !value.is_nan())
                .map(|((year, date), value)| IceSheetRecord {
                    year: *year,
                    date: *date,
                    source: source.clone(),
                    value,
                }),
        );
    }

    let gap_date = fractional_year_to_date(ICE_SHEET_GAP_YEAR)?;
    for source in ICE_SHEET_GAP_SOURCES {
        if table.has_column(source) {
            records.push(IceSheetRecord {
                year: ICE_SHEET_GAP_YEAR,
                date: gap_date,
                source: source.to_string(),
                value: f64::NAN,
            });
        }
    }

    records.sort_by(|a, b| a.source.cmp(&b.source).then(a.date.cmp(&b.date)));
    Ok(records)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaIceRecord {
    pub region: Hemisphere,
    pub date: NaiveDate,
    pub extent: f64,
    pub area: f64,
    pub ma_extent: f64,
    pub ma_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeaIceTrend {
    pub region: Hemisphere,
    pub trend: Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeaIce {
    pub records: Vec<SeaIceRecord>,
    pub trends: Vec<SeaIceTrend>,
}

pub fn sea_ice(tables: &[Table]) -> Result<SeaIce, ClimateError> {
    let mut by_region: BTreeMap<Hemisphere, Vec<(NaiveDate, f64, f64)>> = BTreeMap::new();
    for table in tables {
        let years = table.numeric("year")?;
        let months = table.numeric("mo")?;
        let regions = table.text("region")?;
        let extents = table.numeric("extent")?;
        let areas = table.numeric("area")?;
        for idx in 0..table.len() {
            let region = Hemisphere::from_code(regions[idx]).ok_or_else(|| ClimateError::InvalidValue {
                source_id: table.source_id().to_string(),
                column: "region".to_string(),
                value: regions[idx].to_string(),
            })?;
            let date = month_start(years[idx] as i32, months[idx] as u32)?;
            by_region
                .entry(region)
                .or_default()
                .push((date, missing_to_nan(extents[idx]), missing_to_nan(areas[idx])));
        }
    }

    let mut out = SeaIce::default();
    for (region, mut rows) in by_region {
        rows.sort_by_key(|(date, _, _)| *date);
        let extent = interpolate_linear(&rows.iter().map(|row| row.1).collect::<Vec<_>>());
        let area = interpolate_linear(&rows.iter().map(|row| row.2).collect::<Vec<_>>());
        let ma_extent = rolling_mean(&extent, SEA_ICE_WINDOW);
        let ma_area = rolling_mean(&area, SEA_ICE_WINDOW);

        if let Ok(trend) = trendline(&extent) {
            out.trends.push(SeaIceTrend { region, trend });
        }

        out.records.extend(rows.iter().enumerate().map(|(idx, (date, _, _))| SeaIceRecord {
            region,
            date: *date,
            extent: extent[idx],
            area: area[idx],
            ma_extent: ma_extent[idx],
            ma_area: ma_area[idx],
        }));
    }
    Ok(out)
}

fn missing_to_nan(value: f64) -> f64 {
    if value == SEA_ICE_MISSING { f64::NAN } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParseOptions, parse_text};

    fn snow_table(rows: &[(i32, u32, f64)]) -> Table {
        let text: String = rows
            .iter()
            .map(|(year, month, value)| format!("{year} {month} {value}\n"))
            .collect();
        let options = ParseOptions::whitespace().with_names(&["year", "month", "value"]);
        parse_text("snow", &text, &options).unwrap()
    }

    #[test]
    fn snow_duplicate_month_keeps_later_row() {
        let snow = snow_aggregates(&snow_table(&[
            (2000, 3, 10.0),
            (2000, 4, 20.0),
            (2000, 4, 26.0),
            (2000, 5, 30.0),
        ]))
        .unwrap();
        assert_eq!(snow.seasons.len(), 1);
        assert_eq!(snow.seasons[0].season, Season::Spring);
        assert_eq!(snow.seasons[0].value, Some(22.0));
    }

    #[test]
    fn snow_seasons_need_three_months() {
        // Dec 1999 .. Jun 2000 with April missing from the file.
        let table = snow_table(&[
            (1999, 12, 40.0),
            (2000, 1, 44.0),
            (2000, 2, 42.0),
            (2000, 3, 30.0),
            (2000, 5, 20.0),
            (2000, 6, 10.0),
        ]);
        let aggregates = snow_aggregates(&table).unwrap();
        let season = |year, season| {
            aggregates
                .seasons
                .iter()
                .find(|value| value.year == year && value.season == season)
                .cloned()
                .unwrap()
        };
        assert_eq!(season(1999, Season::Winter).value, Some(42.0));
        assert_eq!(season(2000, Season::Spring).value, None);
        assert_eq!(season(2000, Season::Summer).value, None);
        assert!(aggregates.years.iter().all(|year| year.value.is_none()));
    }

    #[test]
    fn snow_year_needs_twelve_months() {
        let rows: Vec<(i32, u32, f64)> = (1..=12).map(|month| (2001, month, month as f64)).collect();
        let aggregates = snow_aggregates(&snow_table(&rows)).unwrap();
        assert_eq!(aggregates.years, vec![YearValue { year: 2001, value: Some(6.5) }]);
        let summer = aggregates
            .seasons
            .iter()
            .find(|value| value.season == Season::Summer)
            .unwrap();
        assert_eq!(summer.value, Some(7.0));
    }

    #[test]
    fn ice_sheets_melt_and_mark_nasa_gap() {
        let text = "Year,NASA - Greenland land ice mass,IMBIE - Greenland\n2017.5,-4000,-3900\n2019.0,-4300,\n";
        let table = parse_text("ice_sheets", text, &ParseOptions::csv()).unwrap();
        let records = ice_sheet_records(&table).unwrap();

        let sources: Vec<&str> = records.iter().map(|record| record.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "IMBIE - Greenland",
                "NASA - Greenland land ice mass",
                "NASA - Greenland land ice mass",
                "NASA - Greenland land ice mass",
            ]
        );
        assert!(records[2].value.is_nan());
        assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert!(records.iter().all(|record| record.source != "NASA - Antarctica land ice mass"));
    }

    #[test]
    fn sea_ice_interpolates_and_smooths() {
        let mut january = String::from("year, mo, data-type, region, extent, area\n");
        let mut february = january.clone();
        for year in 2000..2012 {
            january.push_str(&format!("{year}, 1, Goddard, N, {}, 12.0\n", 14.0 - (year - 2000) as f64 * 0.1));
            let extent = if year == 2005 { -9999.0 } else { 15.0 };
            february.push_str(&format!("{year}, 2, Goddard, N, {extent}, 13.0\n"));
        }
        let options = ParseOptions::csv().with_skip_initial_space();
        let tables = vec![
            parse_text("sea_ice_n_01", &january, &options).unwrap(),
            parse_text("sea_ice_n_02", &february, &options).unwrap(),
        ];

        let sea_ice = sea_ice(&tables).unwrap();
        assert_eq!(sea_ice.records.len(), 24);
        assert!(sea_ice.records.windows(2).all(|pair| pair[0].date < pair[1].date));

        let feb_2005 = sea_ice
            .records
            .iter()
            .find(|record| record.date == NaiveDate::from_ymd_opt(2005, 2, 1).unwrap())
            .unwrap();
        assert!(!feb_2005.extent.is_nan());
        assert!(sea_ice.records[10].ma_extent.is_nan());
        assert!(!sea_ice.records[11].ma_extent.is_nan());
        assert_eq!(sea_ice.records[11].ma_area, 12.5);
        assert_eq!(sea_ice.trends.len(), 1);
        assert_eq!(sea_ice.trends[0].region, Hemisphere::North);
        assert_eq!(sea_ice.trends[0].trend.line.len(), 24);
    }

    #[test]
    fn sea_ice_trend_is_per_month_step() {
        let mut text = String::from("year, mo, data-type, region, extent, area\n");
        for step in 0..24 {
            let (year, month) = (2000 + step / 12, step % 12 + 1);
            text.push_str(&format!("{year}, {month}, Goddard, S, {}, 3.0\n", 15.0 - 0.01 * step as f64));
        }
        let options = ParseOptions::csv().with_skip_initial_space();
        let tables = vec![parse_text("sea_ice_s_01", &text, &options).unwrap()];

        let sea_ice = sea_ice(&tables).unwrap();
        let trend = &sea_ice.trends[0].trend;
        assert_eq!(sea_ice.trends[0].region, Hemisphere::South);
        assert!((trend.fit.slope + 0.01).abs() < 1e-9);
        assert!((trend.line[0] - 15.0).abs() < 1e-9);
        assert!((trend.line[23] - 14.77).abs() < 1e-9);
    }
}
