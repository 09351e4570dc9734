use crate::error::ClimateError;
use crate::sources::long_series;
use crate::table::{Record, SeriesTable, Table};
use crate::transform::{GAP_THRESHOLD_YEARS, insert_gaps, row_mean};

#[derive(Debug, Clone, Copy)]
pub struct IceCoreLayout {
    pub name: &'static str,
    pub year_column: &'static str,
    pub value_columns: &'static [&'static str],
    /// Columns written with `,` thousands separators.
    pub thousands_columns: &'static [&'static str],
}

pub const CO2_ICE_CORE: IceCoreLayout = IceCoreLayout {
    name: "CO2_hist",
    year_column: "Year",
    value_columns: &["Antarctic Ice Cores"],
    thousands_columns: &[],
};

pub const CH4_ICE_CORE: IceCoreLayout = IceCoreLayout {
    name: "CH4_hist",
    year_column: "Year (negative values = BC)",
    value_columns: &["EPICA Dome C, Antarctica", "Law Dome"],
    thousands_columns: &["Law Dome"],
};

pub const N2O_ICE_CORE: IceCoreLayout = IceCoreLayout {
    name: "N2O_hist",
    year_column: "Year (negative values = BC)",
    value_columns: &["EPICA Dome C, Antarctica", "Antarctica (Battle et al.)"],
    thousands_columns: &[],
};

pub fn ice_core_series(table: &Table, layout: &IceCoreLayout) -> Result<SeriesTable, ClimateError> {
    let years = table.numeric(layout.year_column)?;
    let columns = layout
        .value_columns
        .iter()
        .map(|column| {
            if layout.thousands_columns.contains(column) {
                table.numeric_with_thousands(column, ',')
            } else {
                table.numeric(column)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    let values = row_mean(&columns)?;

    let records: Vec<Record> = years
        .into_iter()
        .zip(values)
        .filter(|(year, value)| !year.is_nan() && !value.is_nan())
        .map(|(year, value)| Record::new(year, layout.name, value))
        .collect();

    Ok(SeriesTable::new(insert_gaps(records, GAP_THRESHOLD_YEARS, layout.name)))
}

pub fn latest_series(table: &Table, name: &str) -> Result<SeriesTable, ClimateError> {
    Ok(SeriesTable::new(long_series(table, "year", "mean", name)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParseOptions, parse_text};

    const CH4_FIGURE: &str = "\
Figure 2. Global Atmospheric Concentrations of Methane Over Time
Source: EPA
Data source: various
Web update: 2024

Units: parts per billion
Year (negative values = BC),\"EPICA Dome C, Antarctica\",Law Dome,Cape Grim
-797446,399.3,,
-790000,420.0,,
-650000,500.0,,
1000,,\"1,234.5\",
1010,690.0,\"700.0\",
2020,,,1880.0
";

    fn ch4_table() -> Table {
        parse_text("ch4_hist", CH4_FIGURE, &ParseOptions::csv().with_skip_rows(6)).unwrap()
    }

    #[test]
    fn ice_core_averages_and_drops_direct_measurements() {
        let series = ice_core_series(&ch4_table(), &CH4_ICE_CORE).unwrap();
        let values: Vec<(f64, f64)> = series
            .records
            .iter()
            .filter(|record| !record.is_gap())
            .map(|record| (record.year, record.value))
            .collect();
        assert_eq!(
            values,
            vec![
                (-797446.0, 399.3),
                (-790000.0, 420.0),
                (-650000.0, 500.0),
                (1000.0, 1234.5),
                (1010.0, 695.0),
            ]
        );
        assert!(series.records.iter().all(|record| record.name == "CH4_hist"));
    }

    #[test]
    fn ice_core_gaps_follow_every_large_jump() {
        let series = ice_core_series(&ch4_table(), &CH4_ICE_CORE).unwrap();
        let gaps: Vec<f64> = series
            .records
            .iter()
            .filter(|record| record.is_gap())
            .map(|record| record.year)
            .collect();
        assert_eq!(gaps, vec![-796446.0, -789000.0, -649000.0]);
        for pair in series.records.windows(2) {
            assert!(pair[0].year <= pair[1].year);
        }
    }

    #[test]
    fn latest_series_renames_columns() {
        let text = "# comment\nyear,mean,unc\n2022,417.1,0.1\n";
        let table = parse_text("co2_latest", text, &ParseOptions::csv().with_comment('#')).unwrap();
        let series = latest_series(&table, "CO2_latest").unwrap();
        assert_eq!(series.records, vec![Record::new(2022.0, "CO2_latest", 417.1)]);
    }
}
