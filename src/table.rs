use serde::Serialize;

use crate::error::ClimateError;

const MISSING_MARKERS: [&str; 8] = ["", "nan", "NaN", "NA", "N/A", "***", "null", "--"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    source_id: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(source_id: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            source_id: source_id.into(),
            headers,
            rows,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|header| header == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ClimateError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| ClimateError::MissingColumn {
                source_id: self.source_id.clone(),
                column: name.to_string(),
            })
    }

    pub fn text(&self, name: &str) -> Result<Vec<&str>, ClimateError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    pub fn numeric(&self, name: &str) -> Result<Vec<f64>, ClimateError> {
        self.numeric_cleaned(name, |cell| cell.to_string())
    }

    pub fn numeric_with_thousands(&self, name: &str, separator: char) -> Result<Vec<f64>, ClimateError> {
        self.numeric_cleaned(name, |cell| cell.replace(separator, ""))
    }

    fn numeric_cleaned<F>(&self, name: &str, clean: F) -> Result<Vec<f64>, ClimateError>
    where
        F: Fn(&str) -> String,
    {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| {
                let cell = clean(&row[idx]);
                parse_number(&cell).ok_or_else(|| ClimateError::InvalidValue {
                    source_id: self.source_id.clone(),
                    column: name.to_string(),
                    value: row[idx].clone(),
                })
            })
            .collect()
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[String]) -> bool,
    {
        Table {
            source_id: self.source_id.clone(),
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }
}

/// `Some(NaN)` for missing markers, `None` for garbage.
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if MISSING_MARKERS.contains(&trimmed) {
        return Some(f64::NAN);
    }
    trimmed.parse::<f64>().ok()
}

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub year: f64,
    pub name: String,
    pub value: f64,
}

impl Record {
    pub fn new(year: f64, name: impl Into<String>, value: f64) -> Self {
        Self {
            year,
            name: name.into(),
            value,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.value.is_nan()
    }
}

// NaN gap markers compare equal to each other so parsed series can be compared whole.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.year.to_bits() == other.year.to_bits()
            && (self.value.to_bits() == other.value.to_bits()
                || (self.value.is_nan() && other.value.is_nan()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesTable {
    pub records: Vec<Record>,
}

impl SeriesTable {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn concat(parts: &[&SeriesTable]) -> SeriesTable {
        SeriesTable {
            records: parts
                .iter()
                .flat_map(|part| part.records.iter().cloned())
                .collect(),
        }
    }

    pub fn filter_name(&self, name: &str) -> SeriesTable {
        SeriesTable {
            records: self
                .records
                .iter()
                .filter(|record| record.name == name)
                .cloned()
                .collect(),
        }
    }

    pub fn sort_by_year(&mut self) {
        self.records.sort_by(|a, b| a.year.total_cmp(&b.year));
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn table() -> Table {
        Table::new(
            "fixture",
            vec!["Year".to_string(), "Value".to_string()],
            vec![
                vec!["1990".to_string(), "1.5".to_string()],
                vec!["1991".to_string(), "nan".to_string()],
                vec!["1992".to_string()],
            ],
        )
    }

    #[test]
    fn numeric_reads_missing_as_nan() {
        let values = table().numeric("Value").unwrap();
        assert_eq!(values[0], 1.5);
        assert!(values[1].is_nan());
        assert!(values[2].is_nan());
    }

    #[test]
    fn numeric_rejects_garbage() {
        let mut table = table();
        table.rows[0][1] = "abc".to_string();
        let err = table.numeric("Value").unwrap_err();
        assert_matches!(err, ClimateError::InvalidValue { ref value, .. } if value == "abc");
    }

    #[test]
    fn missing_column_is_reported() {
        let err = table().numeric("Anomaly").unwrap_err();
        assert_matches!(err, ClimateError::MissingColumn { ref column, .. } if column == "Anomaly");
    }

    #[test]
    fn thousands_separators_are_stripped() {
        let table = Table::new(
            "fixture",
            vec!["Law Dome".to_string()],
            vec![vec!["1,234.5".to_string()]],
        );
        assert_eq!(table.numeric_with_thousands("Law Dome", ',').unwrap(), vec![1234.5]);
    }

    #[test]
    fn series_sorts_by_year_keeping_gaps() {
        let mut series = SeriesTable::new(vec![
            Record::new(1950.0, "Temp_parrenin", 0.0),
            Record::new(-18050.0, "Temp_parrenin", -8.1),
            Record::new(-9000.0, "Temp_parrenin", f64::NAN),
        ]);
        series.sort_by_year();
        let years: Vec<f64> = series.records.iter().map(|record| record.year).collect();
        assert_eq!(years, vec![-18050.0, -9000.0, 1950.0]);
        assert!(series.records[1].is_gap());
    }
}
