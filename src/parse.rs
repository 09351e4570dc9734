use serde::{Deserialize, Serialize};

use crate::error::ClimateError;
use crate::table::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Semicolon,
    Whitespace,
}

impl Delimiter {
    fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Semicolon => Some(b';'),
            Delimiter::Whitespace => None,
        }
    }
}

/// Layout of a delimited text source.
///
/// `skip_rows` drops raw lines before anything else. With `names` set the file is read
/// without a header unless `header` is also set, in which case its first line is
/// discarded and replaced by `names`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    #[serde(default)]
    pub delimiter: Delimiter,
    #[serde(default)]
    pub comment: Option<char>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub names: Option<Vec<String>>,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub skip_initial_space: bool,
}

impl ParseOptions {
    pub fn csv() -> Self {
        Self::default()
    }

    pub fn whitespace() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: char) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn with_header(mut self) -> Self {
        self.header = true;
        self
    }

    pub fn with_skip_initial_space(mut self) -> Self {
        self.skip_initial_space = true;
        self
    }
}

pub fn parse_text(source_id: &str, text: &str, options: &ParseOptions) -> Result<Table, ClimateError> {
    let lines = text
        .lines()
        .skip(options.skip_rows)
        .map(|line| match options.comment {
            Some(marker) => line.split(marker).next().unwrap_or_default(),
            None => line,
        })
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let mut records = match options.delimiter.byte() {
        Some(delimiter) => split_delimited(source_id, lines, delimiter, options.skip_initial_space)?,
        None => lines
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect(),
    };

    let headers = match &options.names {
        Some(names) => {
            if options.header && !records.is_empty() {
                records.remove(0);
            }
            names.clone()
        }
        None => {
            if records.is_empty() {
                return Err(ClimateError::Parse {
                    source_id: source_id.to_string(),
                    message: "no header line found".to_string(),
                });
            }
            records.remove(0)
        }
    };

    Ok(Table::new(source_id, headers, records))
}

fn split_delimited<'a, I>(
    source_id: &str,
    lines: I,
    delimiter: u8,
    trim: bool,
) -> Result<Vec<Vec<String>>, ClimateError>
where
    I: Iterator<Item = &'a str>,
{
    let joined = lines.collect::<Vec<_>>().join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(if trim { csv::Trim::All } else { csv::Trim::None })
        .from_reader(joined.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|record| record.iter().map(str::to_string).collect())
                .map_err(|err| ClimateError::Parse {
                    source_id: source_id.to_string(),
                    message: err.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_csv_with_comments() {
        let text = "# NOAA GML\n# header comment\nyear,mean,unc\n1979,336.85,0.11\n\n1980,338.91,0.11\n";
        let options = ParseOptions::csv().with_comment('#');
        let table = parse_text("co2_latest", text, &options).unwrap();
        assert_eq!(table.headers(), ["year", "mean", "unc"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.numeric("mean").unwrap(), vec![336.85, 338.91]);
    }

    #[test]
    fn parse_whitespace_with_names_and_trailing_comment() {
        let text = "% Berkeley Earth\n  1850  -0.4  0.2 % provisional\n  1851 -0.3 0.2\n";
        let options = ParseOptions::whitespace()
            .with_comment('%')
            .with_names(&["Year", "Anomaly", "Unc"]);
        let table = parse_text("be_global", text, &options).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.text("Year").unwrap(), vec!["1850", "1851"]);
        assert_eq!(table.numeric("Unc").unwrap(), vec![0.2, 0.2]);
    }

    #[test]
    fn parse_skip_rows_and_quoted_fields() {
        let text = "title\nsource\nYear,Law Dome\n-1000,\"1,234\"\n";
        let options = ParseOptions::csv().with_skip_rows(2);
        let table = parse_text("ch4_hist", text, &options).unwrap();
        assert_eq!(table.text("Law Dome").unwrap(), vec!["1,234"]);
    }

    #[test]
    fn parse_replaces_header_when_asked() {
        let text = "Date,pH,Unc\n1985-01-01,8.11,0.01\n";
        let options = ParseOptions::csv()
            .with_names(&["date", "value", "uncertainty"])
            .with_header();
        let table = parse_text("ph_hist", text, &options).unwrap();
        assert_eq!(table.headers(), ["date", "value", "uncertainty"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn parse_skip_initial_space() {
        let text = "year, mo, extent\n1979,   1,  15.41\n";
        let options = ParseOptions::csv().with_skip_initial_space();
        let table = parse_text("sea_ice_n_01", text, &options).unwrap();
        assert_eq!(table.headers(), ["year", "mo", "extent"]);
        assert_eq!(table.numeric("extent").unwrap(), vec![15.41]);
    }

    #[test]
    fn parse_empty_text_without_names_fails() {
        let err = parse_text("empty", "# only a comment\n", &ParseOptions::csv().with_comment('#'))
            .unwrap_err();
        assert_matches!(err, ClimateError::Parse { .. });
    }
}
