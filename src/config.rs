use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::SourceId;
use crate::error::ClimateError;
use crate::parse::ParseOptions;

pub const CONFIG_FILE_NAME: &str = "climate-feed.json";
pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const SEA_ICE_TIMEOUT_SECS: u64 = 2;

const SEA_ICE_N_URL: &str = "https://noaadata.apps.nsidc.org/NOAA/G02135/north/monthly/data/";
const SEA_ICE_S_URL: &str = "https://noaadata.apps.nsidc.org/NOAA/G02135/south/monthly/data/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum SourceFormat {
    Text(ParseOptions),
    Excel {
        #[serde(default)]
        sheet: Option<String>,
    },
    #[serde(rename = "netcdf")]
    NetCdf { variable: String, coordinate: String },
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub backup: Utf8PathBuf,
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub format: SourceFormat,
}

impl SourceConfig {
    fn local(backup: Utf8PathBuf, format: SourceFormat) -> Self {
        Self {
            url: None,
            backup,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            format,
        }
    }

    fn remote(url: &str, backup: Utf8PathBuf, options: ParseOptions) -> Self {
        Self {
            url: Some(url.to_string()),
            backup,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            format: SourceFormat::Text(options),
        }
    }

    fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub data_dir: Utf8PathBuf,
    pub sources: BTreeMap<SourceId, SourceConfig>,
}

impl Catalog {
    pub fn get(&self, id: &SourceId) -> Result<&SourceConfig, ClimateError> {
        self.sources
            .get(id)
            .ok_or_else(|| ClimateError::UnknownSource(id.to_string()))
    }

    pub fn lookup(&self, id: &str) -> Result<(SourceId, &SourceConfig), ClimateError> {
        let id: SourceId = id.parse()?;
        let config = self.get(&id)?;
        Ok((id, config))
    }

    pub fn insert(&mut self, id: SourceId, config: SourceConfig) {
        self.sources.insert(id, config);
    }

    pub fn offline(mut self) -> Self {
        for config in self.sources.values_mut() {
            config.url = None;
        }
        self
    }

    pub fn map_ids(&self) -> Vec<&SourceId> {
        self.sources
            .keys()
            .filter(|id| id.as_str().starts_with("map_"))
            .collect()
    }

    pub fn builtin(data_dir: &Utf8Path) -> Self {
        let path = |name: &str| data_dir.join(name);
        let mut sources = BTreeMap::new();
        let mut add = |id: &str, config: SourceConfig| {
            sources.insert(SourceId::builtin(id), config);
        };

        let noaa_gml = ParseOptions::csv().with_comment('#');
        add(
            "co2_latest",
            SourceConfig::remote(
                "https://gml.noaa.gov/webdata/ccgg/trends/co2/co2_annmean_gl.csv",
                path("co2_annmean_gl.csv"),
                noaa_gml.clone(),
            ),
        );
        add(
            "ch4_latest",
            SourceConfig::remote(
                "https://gml.noaa.gov/webdata/ccgg/trends/ch4/ch4_annmean_gl.csv",
                path("ch4_annmean_gl.csv"),
                noaa_gml.clone(),
            ),
        );
        add(
            "n2o_latest",
            SourceConfig::remote(
                "https://gml.noaa.gov/webdata/ccgg/trends/n2o/n2o_annmean_gl.csv",
                path("n2o_annmean_gl.csv"),
                noaa_gml,
            ),
        );

        let epa_figure = SourceFormat::Text(ParseOptions::csv().with_skip_rows(6));
        add("co2_hist", SourceConfig::local(path("ghg-concentrations_fig-1.csv"), epa_figure.clone()));
        add("ch4_hist", SourceConfig::local(path("ghg-concentrations_fig-2.csv"), epa_figure.clone()));
        add("n2o_hist", SourceConfig::local(path("ghg-concentrations_fig-3.csv"), epa_figure));

        add(
            "parrenin",
            SourceConfig::local(
                path("ATS.tab"),
                SourceFormat::Text(
                    ParseOptions::whitespace()
                        .with_skip_rows(12)
                        .with_names(&["Year", "Value"]),
                ),
            ),
        );
        add(
            "osman",
            SourceConfig::local(
                path("LGMR_GMST_climo.nc"),
                SourceFormat::NetCdf {
                    variable: "gmst".to_string(),
                    coordinate: "age".to_string(),
                },
            ),
        );

        add(
            "be_global",
            SourceConfig::remote(
                "https://berkeley-earth-temperature.s3.us-west-1.amazonaws.com/Global/Land_and_Ocean_summary.txt",
                path("Land_and_Ocean_summary.txt"),
                ParseOptions::whitespace().with_comment('%').with_names(&[
                    "Year",
                    "Annual Anomaly",
                    "Annual Unc.",
                    "Five-year Anomaly",
                    "Five-year Unc.",
                    "Annual Anomaly(W)",
                    "Annual Unc.(W)",
                    "Five-year Anomaly(W)",
                    "Five-year Unc.(W)",
                ]),
            ),
        );
        add(
            "be_antarctica",
            SourceConfig::remote(
                "https://berkeley-earth-temperature.s3.us-west-1.amazonaws.com/Regional/TAVG/antarctica-TAVG-Trend.txt",
                path("antarctica-TAVG-Trend.txt"),
                ParseOptions::whitespace().with_comment('%').with_names(&[
                    "Year",
                    "Month",
                    "Monthly Anomaly",
                    "Monthly Unc.",
                    "Annual Anomaly",
                    "Annual Unc.",
                    "Five-year Anomaly",
                    "Five-year Unc.",
                ]),
            ),
        );
        add(
            "gistemp",
            SourceConfig::remote(
                "https://data.giss.nasa.gov/gistemp/tabledata_v4/GLB.Ts+dSST.csv",
                path("GLB.Ts+dSST.csv"),
                ParseOptions::csv().with_skip_rows(1),
            ),
        );
        add(
            "hadcrut",
            SourceConfig::remote(
                "https://www.metoffice.gov.uk/hadobs/hadcrut5/data/HadCRUT.5.0.2.0/analysis/diagnostics/HadCRUT.5.0.2.0.analysis.summary_series.global.annual.csv",
                path("HadCRUT.5.0.2.0.analysis.summary_series.global.annual.csv"),
                ParseOptions::csv(),
            ),
        );
        add(
            "noaa_global",
            SourceConfig::remote(
                "https://www.ncei.noaa.gov/access/monitoring/global/time-series/globe/land_ocean/1/0/1850-2025/data.csv",
                path("noaa_globaltemp_land_ocean.csv"),
                ParseOptions::csv().with_comment('#'),
            ),
        );
        add(
            "cmip6",
            SourceConfig::local(path("global_mean_temp_data.xlsx"), SourceFormat::Excel { sheet: None }),
        );

        add(
            "snow",
            SourceConfig::remote(
                "https://climate.rutgers.edu/snowcover/files/moncov.nhland.txt",
                path("moncov.nhland.txt"),
                ParseOptions::whitespace().with_names(&["year", "month", "value"]),
            ),
        );
        add(
            "glaciers",
            SourceConfig::remote(
                "https://www.epa.gov/system/files/other-files/2024-05/glaciers_fig-1.csv",
                path("glaciers_fig-1.csv"),
                ParseOptions::csv().with_skip_rows(6),
            ),
        );
        add(
            "ice_sheets",
            SourceConfig::remote(
                "https://www.epa.gov/system/files/other-files/2024-05/ice_sheets_fig-1.csv",
                path("ice_sheets_fig-1.csv"),
                ParseOptions::csv().with_skip_rows(6),
            ),
        );
        for month in 1..=12u32 {
            for (prefix, base_url) in [("N", SEA_ICE_N_URL), ("S", SEA_ICE_S_URL)] {
                let file_name = sea_ice_file_name(prefix, month);
                add(
                    &sea_ice_source_id(prefix, month),
                    SourceConfig::remote(
                        &format!("{base_url}{file_name}"),
                        path(&file_name),
                        ParseOptions::csv().with_skip_initial_space(),
                    )
                    .with_timeout(SEA_ICE_TIMEOUT_SECS),
                );
            }
        }

        add(
            "sea_level_hist",
            SourceConfig::local(
                path("CSIRO_Recons_gmsl_yr_2015.txt"),
                SourceFormat::Text(ParseOptions::whitespace().with_names(&["Year", "Value", "Unc"])),
            ),
        );
        add(
            "sea_level_latest",
            SourceConfig::remote(
                "https://climate.copernicus.eu/sites/default/files/custom-uploads/indicators-2024/sea-level/fig1/fig1_sea_level_indicators_climate_global_area_averaged_anomalies_DT24_updated_towards_2024_07_29_DATA.csv",
                path("fig1_sea_level_indicators_climate_global_area_averaged_anomalies_DT24_updated_towards_2024_07_29_DATA.csv"),
                ParseOptions::csv(),
            ),
        );
        add(
            "sea_level_projection",
            SourceConfig::local(
                path("ipcc_ar6_sea_level_projection_global.xlsx"),
                SourceFormat::Excel {
                    sheet: Some("Total".to_string()),
                },
            ),
        );

        add(
            "ph_hist",
            SourceConfig::local(
                path("CSVExport.csv"),
                SourceFormat::Text(
                    ParseOptions::csv()
                        .with_names(&["date", "value", "uncertainty"])
                        .with_header(),
                ),
            ),
        );
        add(
            "ph_aloha",
            SourceConfig::remote(
                "https://hahana.soest.hawaii.edu/hot/hotco2/HOT_surface_CO2.txt",
                path("df_aloha.csv"),
                ParseOptions::whitespace().with_skip_rows(8),
            ),
        );
        for (id, file) in [
            ("ohc_300", "global_ohc300m_2024.csv"),
            ("ohc_700", "global_ohc700m_2024.csv"),
            ("ohc_2000", "global_ohc2km_2024.csv"),
            ("ohc_700_2000", "global_ohc700-2km_2024.csv"),
            ("erf", "AR6_ERF_1750-2019.csv"),
            ("erf_pc05", "AR6_ERF_1750-2019_pc05.csv"),
            ("erf_pc95", "AR6_ERF_1750-2019_pc95.csv"),
            ("warming_historic", "fig7.8.csv"),
        ] {
            add(id, SourceConfig::local(path(file), SourceFormat::Text(ParseOptions::csv())));
        }
        add(
            "climate_feedback",
            SourceConfig::local(path("cmip56_feedbacks_AR6.json"), SourceFormat::Json),
        );

        add(
            "ghg_emissions",
            SourceConfig::remote(
                "https://ourworldindata.org/grapher/ghg-emissions-by-gas.csv",
                path("ghg-emissions-by-gas.csv"),
                ParseOptions::csv(),
            ),
        );
        add(
            "population",
            SourceConfig::remote(
                "https://ourworldindata.org/grapher/population.csv",
                path("population.csv"),
                ParseOptions::csv(),
            ),
        );
        add(
            "energy",
            SourceConfig::remote(
                "https://ourworldindata.org/grapher/global-primary-energy.csv",
                path("global-primary-energy.csv"),
                ParseOptions::csv(),
            ),
        );

        for map in [
            "be_1950to1993_temp",
            "be_1994to2024_temp",
            "cmip6_2025to2049_temp",
            "cmip6_2050to2074_temp",
            "cmip6_2075to2099_temp",
            "cmip6_2025to2049_precip",
            "cmip6_2050to2099_precip",
        ] {
            let (family, period) = map.split_once('_').unwrap_or((map, ""));
            add(
                &format!("map_{map}"),
                SourceConfig::local(
                    path(&format!("df_{family}_wide_{period}.csv")),
                    SourceFormat::Text(ParseOptions::csv()),
                ),
            );
        }
        for map in ["1983to2024_precip", "mid_century_tws", "late_century_tws"] {
            add(
                &format!("map_{map}"),
                SourceConfig::local(
                    path(&format!("df_wide_{map}.csv")),
                    SourceFormat::Text(ParseOptions::csv()),
                ),
            );
        }

        Self {
            data_dir: data_dir.to_path_buf(),
            sources,
        }
    }
}

pub fn sea_ice_source_id(hemisphere_code: &str, month: u32) -> String {
    format!("sea_ice_{}_{month:02}", hemisphere_code.to_lowercase())
}

fn sea_ice_file_name(hemisphere_code: &str, month: u32) -> String {
    format!("{hemisphere_code}_{month:02}_extent_v4.0.csv")
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Shorthand(String),
    Detailed(SourceOverride),
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourceOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub backup: Option<Utf8PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>, data_dir: Option<&Utf8Path>) -> Result<Catalog, ClimateError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| ClimateError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| ClimateError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Self::resolve_config(config, data_dir)
    }

    pub fn resolve_config(config: Config, data_dir: Option<&Utf8Path>) -> Result<Catalog, ClimateError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(ClimateError::ConfigParse(format!(
                "unsupported schema_version {schema_version}, expected {SCHEMA_VERSION}"
            )));
        }
        let data_dir = data_dir
            .map(Utf8Path::to_path_buf)
            .or(config.data_dir)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATA_DIR));
        let mut catalog = Catalog::builtin(&data_dir);

        for (id, entry) in config.sources {
            let id: SourceId = id.parse()?;
            let mut source = catalog.get(&id)?.clone();
            match entry {
                SourceEntry::Shorthand(url) => source.url = Some(url),
                SourceEntry::Detailed(overrides) => {
                    if overrides.offline {
                        source.url = None;
                    } else if let Some(url) = overrides.url {
                        source.url = Some(url);
                    }
                    if let Some(backup) = overrides.backup {
                        source.backup = if backup.is_absolute() {
                            backup
                        } else {
                            data_dir.join(backup)
                        };
                    }
                    if let Some(timeout_secs) = overrides.timeout_secs {
                        source.timeout_secs = timeout_secs;
                    }
                }
            }
            catalog.insert(id, source);
        }

        Ok(catalog)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("climate-feed").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }
}
