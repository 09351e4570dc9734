use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ClimateError;
use crate::table::Table;
use crate::transform::{EntityValue, forward_fill, per_capita};

pub const WORLD_ENTITY: &str = "World";
const ID_COLUMNS: [&str; 3] = ["Entity", "Code", "Year"];
const FORWARD_FILLED_ENERGY: &str = "Traditional biomass";

static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("country code regex is valid"));
static UNIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(TWh[^)]*\)\s*$").expect("unit suffix regex is valid"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionRecord {
    pub entity: String,
    pub code: Option<String>,
    pub year: i32,
    pub co2: f64,
    pub ch4: f64,
    pub n2o: f64,
}

impl EmissionRecord {
    pub fn total(&self) -> f64 {
        self.co2 + self.ch4 + self.n2o
    }

    pub fn is_country(&self) -> bool {
        self.code.as_deref().is_some_and(|code| COUNTRY_CODE.is_match(code))
    }
}

pub fn emission_records(table: &Table) -> Result<Vec<EmissionRecord>, ClimateError> {
    let entities = table.text("Entity")?;
    let codes = table.text("Code")?;
    let years = table.numeric("Year")?;
    let co2 = table.numeric("annual_emissions_co2_total")?;
    let ch4 = table.numeric("annual_emissions_ch4_total_co2eq")?;
    let n2o = table.numeric("annual_emissions_n2o_total_co2eq")?;

    Ok((0..table.len())
        .filter(|&idx| !years[idx].is_nan())
        .map(|idx| EmissionRecord {
            entity: entities[idx].to_string(),
            code: Some(codes[idx].trim())
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            year: years[idx] as i32,
            co2: co2[idx],
            ch4: ch4[idx],
            n2o: n2o[idx],
        })
        .collect())
}

pub fn entity_values(table: &Table) -> Result<Vec<EntityValue>, ClimateError> {
    let value_column = table
        .headers()
        .iter()
        .find(|header| !ID_COLUMNS.contains(&header.as_str()))
        .ok_or_else(|| ClimateError::Parse {
            source_id: table.source_id().to_string(),
            message: "no value column".to_string(),
        })?;
    let entities = table.text("Entity")?;
    let years = table.numeric("Year")?;
    let values = table.numeric(value_column)?;
    Ok((0..table.len())
        .filter(|&idx| !years[idx].is_nan())
        .map(|idx| EntityValue {
            entity: entities[idx].to_string(),
            year: years[idx] as i32,
            value: values[idx],
        })
        .collect())
}

pub fn emissions_per_capita(
    records: &[EmissionRecord],
    population: &[EntityValue],
) -> Vec<EntityValue> {
    let totals: Vec<EntityValue> = records
        .iter()
        .filter(|record| record.is_country())
        .map(|record| EntityValue {
            entity: record.entity.clone(),
            year: record.year,
            value: record.total(),
        })
        .collect();
    let observed: HashSet<(&str, i32)> = totals
        .iter()
        .map(|row| (row.entity.as_str(), row.year))
        .collect();
    let population: Vec<EntityValue> = population
        .iter()
        .filter(|row| observed.contains(&(row.entity.as_str(), row.year)))
        .cloned()
        .collect();
    per_capita(&totals, &population)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnergyTable {
    pub years: Vec<i32>,
    pub sources: BTreeMap<String, Vec<f64>>,
}

pub fn energy_label(column: &str) -> String {
    UNIT_SUFFIX.replace(column, "").into_owned()
}

pub fn world_energy(table: &Table) -> Result<EnergyTable, ClimateError> {
    let entity_idx = table.column_index("Entity")?;
    let world = table.filter_rows(|row| row[entity_idx] == WORLD_ENTITY);

    let mut years: Vec<(usize, i32)> = world
        .numeric("Year")?
        .into_iter()
        .enumerate()
        .map(|(idx, year)| (idx, year as i32))
        .collect();
    years.sort_by_key(|(_, year)| *year);

    let mut sources = BTreeMap::new();
    for header in world.headers() {
        if ID_COLUMNS.contains(&header.as_str()) {
            continue;
        }
        let values = world.numeric(header)?;
        let ordered: Vec<f64> = years.iter().map(|(idx, _)| values[*idx]).collect();
        let label = energy_label(header);
        let ordered = if label == FORWARD_FILLED_ENERGY {
            forward_fill(&ordered)
        } else {
            ordered
        };
        sources.insert(label, ordered);
    }

    Ok(EnergyTable {
        years: years.into_iter().map(|(_, year)| year).collect(),
        sources,
    })
}
