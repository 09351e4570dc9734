use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use climate_feed::app::ClimateData;
use climate_feed::config::{Catalog, ConfigLoader};
use climate_feed::domain::Dataset;
use climate_feed::error::ClimateError;
use climate_feed::fetch::{HttpRemote, RemoteSource};
use climate_feed::output::JsonOutput;

#[derive(Parser)]
#[command(name = "climate-feed")]
#[command(about = "Fetch and normalise climate datasets, falling back to local copies when a source is down")]
#[command(version, author)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to climate-feed.json")]
    config: Option<String>,

    #[arg(long, global = true, help = "Directory holding the backup files")]
    data_dir: Option<Utf8PathBuf>,

    #[arg(long, global = true, help = "Never touch the network; read backups only")]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List configured sources with their URL and backup file")]
    Sources,
    #[command(about = "List dataset names accepted by `fetch`")]
    Datasets,
    #[command(about = "Build one dataset and print it as JSON")]
    Fetch(FetchArgs),
    #[command(
        about = "Build every dataset and report where each source was read from",
        long_about = "Build every dataset and report where each source was read from.\n\n`osman` and `temperature-overview` read a NetCDF file and are reported as failed unless the binary was built with `--features netcdf`."
    )]
    Status,
}

#[derive(Args)]
struct FetchArgs {
    dataset: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ClimateError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ClimateError) -> u8 {
    match error {
        ClimateError::InvalidDataset(_)
        | ClimateError::InvalidSourceId(_)
        | ClimateError::UnknownSource(_)
        | ClimateError::ConfigRead(_)
        | ClimateError::ConfigParse(_) => 2,
        ClimateError::Http(_)
        | ClimateError::HttpStatus { .. }
        | ClimateError::Backup { .. }
        | ClimateError::Parse { .. }
        | ClimateError::MissingColumn { .. }
        | ClimateError::InvalidValue { .. }
        | ClimateError::Excel(_)
        | ClimateError::NetCdf(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut catalog = ConfigLoader::resolve(cli.global.config.as_deref(), cli.global.data_dir.as_deref())?;
    if cli.global.offline {
        catalog = catalog.offline();
    }

    match cli.command {
        Commands::Sources => JsonOutput::print_sources(&catalog.sources).into_diagnostic(),
        Commands::Datasets => {
            let data = ClimateData::new(catalog, NopRemote);
            JsonOutput::print_datasets(&data.dataset_list()).into_diagnostic()
        }
        Commands::Fetch(args) => {
            let dataset: Dataset = args.dataset.parse()?;
            with_remote(catalog, cli.global.offline, |data| {
                let value = data.load_json(&dataset)?;
                JsonOutput::print_dataset(&value).into_diagnostic()
            })
        }
        Commands::Status => with_remote(catalog, cli.global.offline, |data| {
            JsonOutput::print_status(&data.status()).into_diagnostic()
        }),
    }
}

fn with_remote<F>(catalog: Catalog, offline: bool, run: F) -> miette::Result<()>
where
    F: Fn(&ClimateData<Box<dyn RemoteSource>>) -> miette::Result<()>,
{
    let remote: Box<dyn RemoteSource> = if offline {
        Box::new(NopRemote)
    } else {
        Box::new(HttpRemote::new()?)
    };
    run(&ClimateData::new(catalog, remote))
}

struct NopRemote;

impl RemoteSource for NopRemote {
    fn get_bytes(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, ClimateError> {
        Err(ClimateError::Http(format!("network disabled; not fetching {url}")))
    }
}
