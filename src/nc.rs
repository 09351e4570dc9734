use camino::Utf8Path;

use crate::error::ClimateError;

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub coordinate: Vec<f64>,
    pub values: Vec<f64>,
}

#[cfg(feature = "netcdf")]
pub fn read_profile(path: &Utf8Path, variable: &str, coordinate: &str) -> Result<Profile, ClimateError> {
    let file = ::netcdf::open(path).map_err(|err| ClimateError::NetCdf(format!("{path}: {err}")))?;
    let read = |name: &str| -> Result<Vec<f64>, ClimateError> {
        let var = file
            .variable(name)
            .ok_or_else(|| ClimateError::NetCdf(format!("{path}: no variable `{name}`")))?;
        var.get_values::<f64, _>(..)
            .map_err(|err| ClimateError::NetCdf(format!("{path} [{name}]: {err}")))
    };

    let coordinate = read(coordinate)?;
    let values = read(variable)?;
    if coordinate.len() != values.len() {
        return Err(ClimateError::Shape(format!(
            "{path}: `{variable}` has {} values along {} coordinates",
            values.len(),
            coordinate.len()
        )));
    }
    Ok(Profile { coordinate, values })
}

#[cfg(not(feature = "netcdf"))]
pub fn read_profile(path: &Utf8Path, _variable: &str, _coordinate: &str) -> Result<Profile, ClimateError> {
    Err(ClimateError::UnsupportedFormat(format!(
        "{path}: built without the `netcdf` feature; rebuild with `--features netcdf` to read it"
    )))
}
