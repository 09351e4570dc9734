use std::fs;
use std::io::Read;
use std::time::Duration;

use camino::Utf8Path;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::config::{SourceConfig, SourceFormat};
use crate::domain::{Provenance, SourceId};
use crate::error::ClimateError;
use crate::parse::{ParseOptions, parse_text};
use crate::table::Table;

pub trait RemoteSource: Send + Sync {
    fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ClimateError>;
}

impl<T: RemoteSource + ?Sized> RemoteSource for Box<T> {
    fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ClimateError> {
        (**self).get_bytes(url, timeout)
    }
}

#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
}

impl HttpRemote {
    pub fn new() -> Result<Self, ClimateError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("climate-feed/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ClimateError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| ClimateError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl RemoteSource for HttpRemote {
    fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ClimateError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|err| ClimateError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ClimateError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response
            .bytes()
            .map_err(|err| ClimateError::Http(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub provenance: Provenance,
}

pub fn fetch_table(
    remote: &dyn RemoteSource,
    id: &SourceId,
    source: &SourceConfig,
) -> Result<Fetched<Table>, ClimateError> {
    let SourceFormat::Text(options) = &source.format else {
        return Err(ClimateError::UnsupportedFormat(format!(
            "{id} is not a delimited text source"
        )));
    };

    let Some(url) = &source.url else {
        let data = read_backup(id, &source.backup, options)?;
        return Ok(Fetched {
            data,
            provenance: Provenance::Local {
                path: source.backup.clone(),
            },
        });
    };

    let timeout = Duration::from_secs(source.timeout_secs);
    match fetch_live(remote, id, url, timeout, options) {
        Ok(data) => {
            debug!(source = %id, url = %url, rows = data.len(), "fetched live data");
            Ok(Fetched {
                data,
                provenance: Provenance::Live { url: url.clone() },
            })
        }
        Err(err) => {
            warn!(
                source = %id,
                url = %url,
                backup = %source.backup,
                reason = %err,
                "live fetch failed; reading backup"
            );
            let data = read_backup(id, &source.backup, options)?;
            Ok(Fetched {
                data,
                provenance: Provenance::Fallback {
                    url: url.clone(),
                    backup: source.backup.clone(),
                    reason: err.to_string(),
                },
            })
        }
    }
}

fn fetch_live(
    remote: &dyn RemoteSource,
    id: &SourceId,
    url: &str,
    timeout: Duration,
    options: &ParseOptions,
) -> Result<Table, ClimateError> {
    let bytes = remote.get_bytes(url, timeout)?;
    let text = decode_payload(url, &bytes).map_err(|err| ClimateError::Http(err.to_string()))?;
    parse_text(id.as_str(), &text, options)
}

pub fn read_backup(id: &SourceId, path: &Utf8Path, options: &ParseOptions) -> Result<Table, ClimateError> {
    let bytes = read_file(path)?;
    let text = decode_payload(path.as_str(), &bytes).map_err(|err| ClimateError::Backup {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    parse_text(id.as_str(), &text, options)
}

pub fn read_file(path: &Utf8Path) -> Result<Vec<u8>, ClimateError> {
    fs::read(path).map_err(|err| ClimateError::Backup {
        path: path.to_string(),
        message: err.to_string(),
    })
}

pub fn decode_payload(name: &str, bytes: &[u8]) -> std::io::Result<String> {
    if name.ends_with(".gz") {
        let mut text = String::new();
        GzDecoder::new(bytes).read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn decode_plain_and_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"year,mean\n1980,338.9\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let text = decode_payload("co2.csv.gz", &compressed).unwrap();
        assert_eq!(text, "year,mean\n1980,338.9\n");
        assert_eq!(decode_payload("co2.csv", b"a,b\n").unwrap(), "a,b\n");
    }

    #[test]
    fn decode_rejects_corrupt_gzip() {
        assert!(decode_payload("co2.csv.gz", b"not gzip").is_err());
    }
}
