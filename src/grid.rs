use ndarray::{Array2, Axis, concatenate, s};
use serde::Serialize;

use crate::error::ClimateError;
use crate::table::{Table, parse_number};

pub const LATITUDE_COLUMN: &str = "latitude";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    pub values: Array2<f64>,
}

impl Grid {
    pub fn from_wide_table(table: &Table) -> Result<Self, ClimateError> {
        let lat_idx = table.column_index(LATITUDE_COLUMN)?;
        let latitudes = table.numeric(LATITUDE_COLUMN)?;

        let lon_columns: Vec<usize> = (0..table.headers().len()).filter(|idx| *idx != lat_idx).collect();
        let longitudes = lon_columns
            .iter()
            .map(|idx| {
                let header = &table.headers()[*idx];
                header.trim().parse::<f64>().map_err(|_| ClimateError::Parse {
                    source_id: table.source_id().to_string(),
                    message: format!("longitude header `{header}` is not numeric"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Array2::<f64>::from_elem((latitudes.len(), longitudes.len()), f64::NAN);
        for (row_idx, row) in table.rows().iter().enumerate() {
            for (col_idx, source_idx) in lon_columns.iter().enumerate() {
                let cell = &row[*source_idx];
                values[[row_idx, col_idx]] =
                    parse_number(cell).ok_or_else(|| ClimateError::InvalidValue {
                        source_id: table.source_id().to_string(),
                        column: table.headers()[*source_idx].clone(),
                        value: cell.clone(),
                    })?;
            }
        }

        Ok(Self {
            latitudes,
            longitudes,
            values,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn with_cyclic_point(&self) -> Result<Self, ClimateError> {
        let Some(first_lon) = self.longitudes.first() else {
            return Err(ClimateError::Shape("grid has no longitude columns".to_string()));
        };
        let mut longitudes = self.longitudes.clone();
        longitudes.push(first_lon + 360.0);
        let first_column = self.values.slice(s![.., 0..1]);
        let values = concatenate(Axis(1), &[self.values.view(), first_column])
            .map_err(|err| ClimateError::Shape(err.to_string()))?;
        Ok(Self {
            latitudes: self.latitudes.clone(),
            longitudes,
            values,
        })
    }
}
