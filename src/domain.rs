use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ClimateError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    pub(crate) fn builtin(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = ClimateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if !is_valid {
            return Err(ClimateError::InvalidSourceId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

impl TryFrom<String> for SourceId {
    type Error = ClimateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dataset {
    Co2Hist,
    Ch4Hist,
    N2oHist,
    Co2Latest,
    Ch4Latest,
    N2oLatest,
    Parrenin,
    Osman,
    BeGlobal,
    BeGlobalFull,
    BeAntarctica,
    Gistemp,
    Hadcrut,
    NoaaGlobal,
    Cmip6,
    Snow,
    Glaciers,
    IceSheets,
    SeaIce,
    SeaLevelHist,
    SeaLevelLatest,
    SeaLevelProjection,
    Ph,
    OceanHeat,
    Erf,
    WarmingHistoric,
    ClimateFeedback,
    GhgEmissions,
    EmissionsPerCapita,
    Energy,
    GhgOverview,
    TemperatureOverview,
    Map(SourceId),
}

impl Dataset {
    pub const NAMED: [Dataset; 32] = [
        Dataset::Co2Hist,
        Dataset::Ch4Hist,
        Dataset::N2oHist,
        Dataset::Co2Latest,
        Dataset::Ch4Latest,
        Dataset::N2oLatest,
        Dataset::Parrenin,
        Dataset::Osman,
        Dataset::BeGlobal,
        Dataset::BeGlobalFull,
        Dataset::BeAntarctica,
        Dataset::Gistemp,
        Dataset::Hadcrut,
        Dataset::NoaaGlobal,
        Dataset::Cmip6,
        Dataset::Snow,
        Dataset::Glaciers,
        Dataset::IceSheets,
        Dataset::SeaIce,
        Dataset::SeaLevelHist,
        Dataset::SeaLevelLatest,
        Dataset::SeaLevelProjection,
        Dataset::Ph,
        Dataset::OceanHeat,
        Dataset::Erf,
        Dataset::WarmingHistoric,
        Dataset::ClimateFeedback,
        Dataset::GhgEmissions,
        Dataset::EmissionsPerCapita,
        Dataset::Energy,
        Dataset::GhgOverview,
        Dataset::TemperatureOverview,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Co2Hist => "co2-hist",
            Dataset::Ch4Hist => "ch4-hist",
            Dataset::N2oHist => "n2o-hist",
            Dataset::Co2Latest => "co2-latest",
            Dataset::Ch4Latest => "ch4-latest",
            Dataset::N2oLatest => "n2o-latest",
            Dataset::Parrenin => "parrenin",
            Dataset::Osman => "osman",
            Dataset::BeGlobal => "be-global",
            Dataset::BeGlobalFull => "be-global-full",
            Dataset::BeAntarctica => "be-antarctica",
            Dataset::Gistemp => "gistemp",
            Dataset::Hadcrut => "hadcrut",
            Dataset::NoaaGlobal => "noaa-global",
            Dataset::Cmip6 => "cmip6",
            Dataset::Snow => "snow",
            Dataset::Glaciers => "glaciers",
            Dataset::IceSheets => "ice-sheets",
            Dataset::SeaIce => "sea-ice",
            Dataset::SeaLevelHist => "sea-level-hist",
            Dataset::SeaLevelLatest => "sea-level-latest",
            Dataset::SeaLevelProjection => "sea-level-projection",
            Dataset::Ph => "ph",
            Dataset::OceanHeat => "ocean-heat",
            Dataset::Erf => "erf",
            Dataset::WarmingHistoric => "warming-historic",
            Dataset::ClimateFeedback => "climate-feedback",
            Dataset::GhgEmissions => "ghg-emissions",
            Dataset::EmissionsPerCapita => "emissions-per-capita",
            Dataset::Energy => "energy",
            Dataset::GhgOverview => "ghg-overview",
            Dataset::TemperatureOverview => "temperature-overview",
            Dataset::Map(_) => "map",
        }
    }

    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Map(id) => write!(f, "map:{id}"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for Dataset {
    type Err = ClimateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Some(rest) = trimmed.strip_prefix("map:") {
            return Ok(Dataset::Map(rest.parse()?));
        }
        Dataset::NAMED
            .iter()
            .find(|dataset| dataset.name().eq_ignore_ascii_case(trimmed))
            .cloned()
            .ok_or_else(|| ClimateError::InvalidDataset(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Provenance {
    Live {
        url: String,
    },
    Fallback {
        url: String,
        backup: Utf8PathBuf,
        reason: String,
    },
    Local {
        path: Utf8PathBuf,
    },
}

impl Provenance {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Provenance::Fallback { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Autumn => write!(f, "Autumn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
}

impl Hemisphere {
    pub fn code(&self) -> &'static str {
        match self {
            Hemisphere::North => "N",
            Hemisphere::South => "S",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "N" => Some(Hemisphere::North),
            "S" => Some(Hemisphere::South),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_source_id_normalizes_case() {
        let id: SourceId = "CO2_Latest".parse().unwrap();
        assert_eq!(id.as_str(), "co2_latest");
    }

    #[test]
    fn parse_source_id_invalid() {
        let err = "co2-latest".parse::<SourceId>().unwrap_err();
        assert_matches!(err, ClimateError::InvalidSourceId(_));
    }

    #[test]
    fn dataset_names_round_trip() {
        for dataset in Dataset::NAMED.iter() {
            let parsed: Dataset = dataset.to_string().parse().unwrap();
            assert_eq!(&parsed, dataset);
        }
    }

    #[test]
    fn parse_map_dataset() {
        let dataset: Dataset = "map:map_be_1950to1993_temp".parse().unwrap();
        assert_matches!(dataset, Dataset::Map(ref id) if id.as_str() == "map_be_1950to1993_temp");
        assert_eq!(dataset.cache_key(), "map:map_be_1950to1993_temp");
    }

    #[test]
    fn parse_unknown_dataset() {
        let err = "ozone".parse::<Dataset>().unwrap_err();
        assert_matches!(err, ClimateError::InvalidDataset(_));
    }
}
