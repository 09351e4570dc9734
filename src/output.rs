use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;

use crate::app::{DatasetList, StatusReport};
use crate::config::SourceConfig;
use crate::domain::SourceId;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sources(sources: &BTreeMap<SourceId, SourceConfig>) -> io::Result<()> {
        Self::print_json(sources)
    }

    pub fn print_datasets(list: &DatasetList) -> io::Result<()> {
        Self::print_json(list)
    }

    pub fn print_dataset(value: &Value) -> io::Result<()> {
        Self::print_json(value)
    }

    pub fn print_status(report: &StatusReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
