//! Shared helpers for the integration tests

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use url::Url;
use wiremock::MockServer;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use terragate::config::Endpoints;

/// Four mock servers standing in for the backend services.
pub struct MockBackends {
    pub language: MockServer,
    pub codebase: MockServer,
    pub suggestion: MockServer,
    pub terraform: MockServer,
}

impl MockBackends {
    pub async fn start() -> Self {
        Self {
            language: MockServer::start().await,
            codebase: MockServer::start().await,
            suggestion: MockServer::start().await,
            terraform: MockServer::start().await,
        }
    }

    /// Endpoints pointing at the mock servers, one path per service.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            language_context: Url::parse(&format!("{}/language", self.language.uri())).unwrap(),
            codebase_context: Url::parse(&format!("{}/codebase", self.codebase.uri())).unwrap(),
            deployment_suggestion: Url::parse(&format!("{}/suggest", self.suggestion.uri()))
                .unwrap(),
            terraform_generation: Url::parse(&format!("{}/terraform", self.terraform.uri()))
                .unwrap(),
        }
    }
}

/// Build an in-memory zip from (name, contents) pairs. Names ending in `/`
/// become directory entries.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Decode a zip into a name -> contents map.
pub fn entry_map(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut map = BTreeMap::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        map.insert(entry.name().to_string(), data);
    }
    map
}

/// A URL on a port nothing is listening on; connections are refused.
pub fn unreachable_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
}
