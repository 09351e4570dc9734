#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use climate_feed::config::Catalog;
use climate_feed::error::ClimateError;
use climate_feed::fetch::RemoteSource;

pub fn fixture_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data")
}

pub fn fixture_catalog() -> Catalog {
    Catalog::builtin(&fixture_dir())
}

pub fn offline_catalog(data_dir: &Utf8Path) -> Catalog {
    Catalog::builtin(data_dir).offline()
}

/// Serves canned bodies by URL and counts every request.
#[derive(Default)]
pub struct MockRemote {
    bodies: HashMap<String, String>,
    statuses: HashMap<String, u16>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.statuses.insert(url.to_string(), status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteSource for MockRemote {
    fn get_bytes(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, ClimateError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(status) = self.statuses.get(url) {
            return Err(ClimateError::HttpStatus {
                status: *status,
                url: url.to_string(),
            });
        }
        self.bodies
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| ClimateError::Http(format!("connection refused: {url}")))
    }
}
