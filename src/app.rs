use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::DatasetCache;
use crate::config::{Catalog, SourceConfig, SourceFormat, sea_ice_source_id};
use crate::domain::{Dataset, Hemisphere, Provenance, SourceId};
use crate::error::ClimateError;
use crate::excel;
use crate::fetch::{RemoteSource, fetch_table, read_file};
use crate::grid::Grid;
use crate::nc::{self, Profile};
use crate::sources::cryosphere::{self, IceSheetRecord, SeaIce, SnowAggregates};
use crate::sources::emissions::{self, EmissionRecord, EnergyTable};
use crate::sources::forcing::{self, ErfTables, FeedbackRecord};
use crate::sources::ghg::{self, CH4_ICE_CORE, CO2_ICE_CORE, IceCoreLayout, N2O_ICE_CORE};
use crate::sources::ocean::{
    self, OCEAN_HEAT_LAYERS, OceanHeatLayer, PhData, ProjectionRecord, SeaLevelObservation,
    SeaLevelRecord,
};
use crate::sources::temperature::{self, GlobalTemperature, ScenarioRecord};
use crate::table::{SeriesTable, Table};
use crate::transform::EntityValue;

const OCEAN_HEAT_SOURCES: [&str; 4] = ["ohc_300", "ohc_700", "ohc_2000", "ohc_700_2000"];

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub dataset: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub datasets: Vec<DatasetStatus>,
    pub sources: BTreeMap<SourceId, Provenance>,
    pub degraded: Vec<SourceId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetList {
    pub datasets: Vec<String>,
}

pub struct ClimateData<R: RemoteSource> {
    catalog: Catalog,
    remote: R,
    cache: DatasetCache,
    provenance: Mutex<BTreeMap<SourceId, Provenance>>,
}

impl<R: RemoteSource> ClimateData<R> {
    pub fn new(catalog: Catalog, remote: R) -> Self {
        Self {
            catalog,
            remote,
            cache: DatasetCache::new(),
            provenance: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn provenance(&self) -> BTreeMap<SourceId, Provenance> {
        self.provenance
            .lock()
            .map(|map| map.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn source_provenance(&self, id: &str) -> Option<Provenance> {
        let id: SourceId = id.parse().ok()?;
        self.provenance().remove(&id)
    }

    pub fn dataset_list(&self) -> DatasetList {
        let mut datasets: Vec<String> = Dataset::NAMED.iter().map(ToString::to_string).collect();
        datasets.extend(
            self.catalog
                .map_ids()
                .into_iter()
                .map(|id| Dataset::Map(id.clone()).to_string()),
        );
        DatasetList { datasets }
    }

    pub fn co2_hist(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.ice_core(Dataset::Co2Hist, "co2_hist", &CO2_ICE_CORE)
    }

    pub fn ch4_hist(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.ice_core(Dataset::Ch4Hist, "ch4_hist", &CH4_ICE_CORE)
    }

    pub fn n2o_hist(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.ice_core(Dataset::N2oHist, "n2o_hist", &N2O_ICE_CORE)
    }

    pub fn co2_latest(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.latest(Dataset::Co2Latest, "co2_latest", "CO2_latest")
    }

    pub fn ch4_latest(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.latest(Dataset::Ch4Latest, "ch4_latest", "CH4_latest")
    }

    pub fn n2o_latest(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.latest(Dataset::N2oLatest, "n2o_latest", "N2O_latest")
    }

    pub fn parrenin(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::Parrenin, || temperature::parrenin_series(&self.table("parrenin")?))
    }

    pub fn osman(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::Osman, || Ok(temperature::osman_series(&self.profile("osman")?)))
    }

    pub fn be_global(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::BeGlobal, || temperature::be_global_series(&self.table("be_global")?))
    }

    pub fn be_global_full(&self) -> Result<Arc<Vec<GlobalTemperature>>, ClimateError> {
        self.cached(Dataset::BeGlobalFull, || temperature::be_global_full(&self.table("be_global")?))
    }

    pub fn be_antarctica(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::BeAntarctica, || {
            temperature::be_antarctica_series(&self.table("be_antarctica")?)
        })
    }

    pub fn gistemp(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::Gistemp, || temperature::gistemp_series(&self.table("gistemp")?))
    }

    pub fn hadcrut(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::Hadcrut, || temperature::hadcrut_series(&self.table("hadcrut")?))
    }

    pub fn noaa_global(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::NoaaGlobal, || {
            temperature::noaa_global_series(&self.table("noaa_global")?)
        })
    }

    pub fn cmip6(&self) -> Result<Arc<Vec<ScenarioRecord>>, ClimateError> {
        self.cached(Dataset::Cmip6, || temperature::cmip6_records(&self.table("cmip6")?))
    }

    pub fn snow(&self) -> Result<Arc<SnowAggregates>, ClimateError> {
        self.cached(Dataset::Snow, || cryosphere::snow_aggregates(&self.table("snow")?))
    }

    pub fn glaciers(&self) -> Result<Arc<Table>, ClimateError> {
        self.cached(Dataset::Glaciers, || self.table("glaciers"))
    }

    pub fn ice_sheets(&self) -> Result<Arc<Vec<IceSheetRecord>>, ClimateError> {
        self.cached(Dataset::IceSheets, || cryosphere::ice_sheet_records(&self.table("ice_sheets")?))
    }

    pub fn sea_ice(&self) -> Result<Arc<SeaIce>, ClimateError> {
        self.cached(Dataset::SeaIce, || {
            let mut tables = Vec::with_capacity(24);
            for month in 1..=12 {
                for hemisphere in [Hemisphere::North, Hemisphere::South] {
                    tables.push(self.table(&sea_ice_source_id(hemisphere.code(), month))?);
                }
            }
            cryosphere::sea_ice(&tables)
        })
    }

    pub fn sea_level_hist(&self) -> Result<Arc<Vec<SeaLevelRecord>>, ClimateError> {
        self.cached(Dataset::SeaLevelHist, || ocean::sea_level_hist(&self.table("sea_level_hist")?))
    }

    pub fn sea_level_latest(&self) -> Result<Arc<Vec<SeaLevelObservation>>, ClimateError> {
        self.cached(Dataset::SeaLevelLatest, || {
            ocean::sea_level_latest(&self.table("sea_level_latest")?)
        })
    }

    pub fn sea_level_projection(&self) -> Result<Arc<Vec<ProjectionRecord>>, ClimateError> {
        self.cached(Dataset::SeaLevelProjection, || {
            ocean::sea_level_projection(&self.table("sea_level_projection")?)
        })
    }

    pub fn ph(&self) -> Result<Arc<PhData>, ClimateError> {
        self.cached(Dataset::Ph, || {
            Ok(PhData {
                global: ocean::ph_global(&self.table("ph_hist")?)?,
                aloha: ocean::ph_aloha(&self.table("ph_aloha")?)?,
            })
        })
    }

    pub fn ocean_heat(&self) -> Result<Arc<Vec<OceanHeatLayer>>, ClimateError> {
        self.cached(Dataset::OceanHeat, || {
            OCEAN_HEAT_SOURCES
                .iter()
                .zip(OCEAN_HEAT_LAYERS)
                .map(|(id, layer)| ocean::ocean_heat_layer(layer, &self.table(id)?))
                .collect()
        })
    }

    pub fn erf(&self) -> Result<Arc<ErfTables>, ClimateError> {
        self.cached(Dataset::Erf, || {
            forcing::erf_tables(
                &self.table("erf")?,
                &self.table("erf_pc05")?,
                &self.table("erf_pc95")?,
            )
        })
    }

    pub fn warming_historic(&self) -> Result<Arc<Table>, ClimateError> {
        self.cached(Dataset::WarmingHistoric, || self.table("warming_historic"))
    }

    pub fn climate_feedback(&self) -> Result<Arc<Vec<FeedbackRecord>>, ClimateError> {
        self.cached(Dataset::ClimateFeedback, || {
            let json = self.json("climate_feedback")?;
            forcing::climate_feedbacks("climate_feedback", &json)
        })
    }

    pub fn ghg_emissions(&self) -> Result<Arc<Vec<EmissionRecord>>, ClimateError> {
        self.cached(Dataset::GhgEmissions, || {
            emissions::emission_records(&self.table("ghg_emissions")?)
        })
    }

    pub fn emissions_per_capita(&self) -> Result<Arc<Vec<EntityValue>>, ClimateError> {
        self.cached(Dataset::EmissionsPerCapita, || {
            let records = self.ghg_emissions()?;
            let population = emissions::entity_values(&self.table("population")?)?;
            Ok(emissions::emissions_per_capita(&records, &population))
        })
    }

    pub fn energy(&self) -> Result<Arc<EnergyTable>, ClimateError> {
        self.cached(Dataset::Energy, || emissions::world_energy(&self.table("energy")?))
    }

    pub fn ghg_overview(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::GhgOverview, || {
            Ok(SeriesTable::concat(&[
                &*self.co2_hist()?,
                &*self.ch4_hist()?,
                &*self.n2o_hist()?,
                &*self.co2_latest()?,
                &*self.ch4_latest()?,
                &*self.n2o_latest()?,
                &*self.parrenin()?,
            ]))
        })
    }

    pub fn temperature_overview(&self) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(Dataset::TemperatureOverview, || {
            Ok(SeriesTable::concat(&[
                &*self.osman()?,
                &*self.be_global()?,
                &*self.co2_hist()?,
                &*self.co2_latest()?,
            ]))
        })
    }

    pub fn map(&self, id: &SourceId) -> Result<Arc<Grid>, ClimateError> {
        if !id.as_str().starts_with("map_") {
            return Err(ClimateError::InvalidDataset(Dataset::Map(id.clone()).to_string()));
        }
        self.cached(Dataset::Map(id.clone()), || {
            Grid::from_wide_table(&self.table(id.as_str())?)
        })
    }

    pub fn load_json(&self, dataset: &Dataset) -> Result<Value, ClimateError> {
        match dataset {
            Dataset::Co2Hist => to_json(dataset, self.co2_hist()?),
            Dataset::Ch4Hist => to_json(dataset, self.ch4_hist()?),
            Dataset::N2oHist => to_json(dataset, self.n2o_hist()?),
            Dataset::Co2Latest => to_json(dataset, self.co2_latest()?),
            Dataset::Ch4Latest => to_json(dataset, self.ch4_latest()?),
            Dataset::N2oLatest => to_json(dataset, self.n2o_latest()?),
            Dataset::Parrenin => to_json(dataset, self.parrenin()?),
            Dataset::Osman => to_json(dataset, self.osman()?),
            Dataset::BeGlobal => to_json(dataset, self.be_global()?),
            Dataset::BeGlobalFull => to_json(dataset, self.be_global_full()?),
            Dataset::BeAntarctica => to_json(dataset, self.be_antarctica()?),
            Dataset::Gistemp => to_json(dataset, self.gistemp()?),
            Dataset::Hadcrut => to_json(dataset, self.hadcrut()?),
            Dataset::NoaaGlobal => to_json(dataset, self.noaa_global()?),
            Dataset::Cmip6 => to_json(dataset, self.cmip6()?),
            Dataset::Snow => to_json(dataset, self.snow()?),
            Dataset::Glaciers => to_json(dataset, self.glaciers()?),
            Dataset::IceSheets => to_json(dataset, self.ice_sheets()?),
            Dataset::SeaIce => to_json(dataset, self.sea_ice()?),
            Dataset::SeaLevelHist => to_json(dataset, self.sea_level_hist()?),
            Dataset::SeaLevelLatest => to_json(dataset, self.sea_level_latest()?),
            Dataset::SeaLevelProjection => to_json(dataset, self.sea_level_projection()?),
            Dataset::Ph => to_json(dataset, self.ph()?),
            Dataset::OceanHeat => to_json(dataset, self.ocean_heat()?),
            Dataset::Erf => to_json(dataset, self.erf()?),
            Dataset::WarmingHistoric => to_json(dataset, self.warming_historic()?),
            Dataset::ClimateFeedback => to_json(dataset, self.climate_feedback()?),
            Dataset::GhgEmissions => to_json(dataset, self.ghg_emissions()?),
            Dataset::EmissionsPerCapita => to_json(dataset, self.emissions_per_capita()?),
            Dataset::Energy => to_json(dataset, self.energy()?),
            Dataset::GhgOverview => to_json(dataset, self.ghg_overview()?),
            Dataset::TemperatureOverview => to_json(dataset, self.temperature_overview()?),
            Dataset::Map(id) => to_json(dataset, self.map(id)?),
        }
    }

    pub fn status(&self) -> StatusReport {
        let datasets = Dataset::NAMED
            .iter()
            .map(|dataset| match self.load_json(dataset) {
                Ok(_) => DatasetStatus {
                    dataset: dataset.to_string(),
                    ok: true,
                    error: None,
                },
                Err(err) => DatasetStatus {
                    dataset: dataset.to_string(),
                    ok: false,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        let sources = self.provenance();
        let degraded = sources
            .iter()
            .filter(|(_, provenance)| provenance.is_degraded())
            .map(|(id, _)| id.clone())
            .collect();
        StatusReport {
            datasets,
            sources,
            degraded,
        }
    }

    fn cached<T, F>(&self, dataset: Dataset, build: F) -> Result<Arc<T>, ClimateError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, ClimateError>,
    {
        let key = dataset.cache_key();
        self.cache.get_or_try_insert_with(&key, || {
            info!(dataset = %key, "building dataset");
            build()
        })
    }

    fn ice_core(
        &self,
        dataset: Dataset,
        source: &str,
        layout: &IceCoreLayout,
    ) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(dataset, || ghg::ice_core_series(&self.table(source)?, layout))
    }

    fn latest(&self, dataset: Dataset, source: &str, name: &str) -> Result<Arc<SeriesTable>, ClimateError> {
        self.cached(dataset, || ghg::latest_series(&self.table(source)?, name))
    }

    fn table(&self, id: &str) -> Result<Table, ClimateError> {
        let (id, source) = self.catalog.lookup(id)?;
        match &source.format {
            SourceFormat::Text(_) => {
                let fetched = fetch_table(&self.remote, &id, source)?;
                self.record(id, fetched.provenance);
                Ok(fetched.data)
            }
            SourceFormat::Excel { sheet } => {
                let table = excel::read_sheet(id.as_str(), &source.backup, sheet.as_deref())?;
                self.record_local(id, source);
                Ok(table)
            }
            other => Err(ClimateError::UnsupportedFormat(format!(
                "{id} is a {} source, not a table",
                format_name(other)
            ))),
        }
    }

    fn profile(&self, id: &str) -> Result<Profile, ClimateError> {
        let (id, source) = self.catalog.lookup(id)?;
        let SourceFormat::NetCdf { variable, coordinate } = &source.format else {
            return Err(ClimateError::UnsupportedFormat(format!("{id} is not a netcdf source")));
        };
        let profile = nc::read_profile(&source.backup, variable, coordinate)?;
        self.record_local(id, source);
        Ok(profile)
    }

    fn json(&self, id: &str) -> Result<Value, ClimateError> {
        let (id, source) = self.catalog.lookup(id)?;
        if source.format != SourceFormat::Json {
            return Err(ClimateError::UnsupportedFormat(format!("{id} is not a JSON source")));
        }
        let bytes = read_file(&source.backup)?;
        let json = serde_json::from_slice(&bytes).map_err(|err| ClimateError::Parse {
            source_id: id.to_string(),
            message: err.to_string(),
        })?;
        self.record_local(id, source);
        Ok(json)
    }

    fn record_local(&self, id: SourceId, source: &SourceConfig) {
        let path: Utf8PathBuf = source.backup.clone();
        self.record(id, Provenance::Local { path });
    }

    fn record(&self, id: SourceId, provenance: Provenance) {
        debug!(source = %id, provenance = ?provenance, "recorded provenance");
        let mut map = self
            .provenance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(id, provenance);
    }
}

fn format_name(format: &SourceFormat) -> &'static str {
    match format {
        SourceFormat::Text(_) => "text",
        SourceFormat::Excel { .. } => "excel",
        SourceFormat::NetCdf { .. } => "netcdf",
        SourceFormat::Json => "json",
    }
}

fn to_json<T: Serialize>(dataset: &Dataset, value: Arc<T>) -> Result<Value, ClimateError> {
    serde_json::to_value(&*value).map_err(|_| ClimateError::Encode(dataset.to_string()))
}
