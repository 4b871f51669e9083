//! Fetching the six aggregate tables from the movie API.
//!
//! A load is all-or-nothing: bodies are looked up in the session memo, then
//! the on-disk cache, then the network, and nothing is written to either
//! cache until every dataset has been fetched and parsed.

pub mod cache;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use thiserror::Error;

use crate::db::Database;
use crate::table::{Dataset, Datasets, Table, TableError};
use cache::DatasetCache;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error(transparent)]
    Shape(#[from] TableError),
}

/// Anything that can GET a URL and hand back a JSON document.
pub trait HttpClient {
    fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Blocking HTTP client with a global per-request timeout.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl HttpClient for UreqClient {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        log::debug!("GET {url}");
        let mut response = self.agent.get(url).call().map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Where a body came from during a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Memo,
    Disk,
    Network,
}

struct DiskCache {
    db: Database,
    ttl: chrono::Duration,
}

/// Loads [`Datasets`] through the memo, disk cache and network in that order.
pub struct Loader<C: HttpClient> {
    client: C,
    memo: DatasetCache,
    disk: Option<DiskCache>,
    show_progress: bool,
}

impl<C: HttpClient> Loader<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            memo: DatasetCache::new(),
            disk: None,
            show_progress: false,
        }
    }

    /// Back the loader with an on-disk response cache whose entries expire after `ttl`.
    pub fn with_disk_cache(mut self, db: Database, ttl: chrono::Duration) -> Self {
        self.disk = Some(DiskCache { db, ttl });
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn memo(&self) -> &DatasetCache {
        &self.memo
    }

    /// Drop the session memo. The disk cache is left alone.
    pub fn invalidate(&mut self) {
        self.memo.invalidate();
    }

    /// Load all six tables from `base_url`. With `refresh`, both caches are
    /// bypassed.
    ///
    /// A `base_url` different from the one the memo is bound to drops the memo
    /// before anything is fetched, so a failed load from a new API leaves the
    /// memo empty. Otherwise a failure modifies neither cache.
    pub fn load(&mut self, base_url: &str, refresh: bool) -> Result<Datasets, FetchError> {
        if self.memo.bind(base_url) {
            log::info!("API base URL changed to {base_url}; cached datasets dropped");
        }

        let pb = if self.show_progress {
            let pb = ProgressBar::new(Dataset::ALL.len() as u64);
            pb.set_style(
                ProgressStyle::with_template("  [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("##-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut pending: Vec<(String, Value, Source)> = Vec::new();
        let mut fetch = |dataset: Dataset| -> Result<Table, FetchError> {
            pb.set_message(dataset.name());
            let url = dataset.url(base_url);
            let (body, source) = self.lookup(&url, refresh)?;
            let table = Table::from_json(dataset, &body)?;
            let missing = table.missing_columns();
            if !missing.is_empty() {
                log::warn!("{dataset}: response is missing columns {}", missing.join(", "));
            }
            match source {
                Source::Network => log::debug!("{dataset}: {} rows fetched", table.len()),
                cached => log::info!("{dataset}: {} rows from {cached:?} cache", table.len()),
            }
            pending.push((url, body, source));
            pb.inc(1);
            Ok(table)
        };

        let loaded = (|| {
            Ok::<_, FetchError>(Datasets {
                monthly: fetch(Dataset::Monthly)?,
                countries: fetch(Dataset::Countries)?,
                runtime: fetch(Dataset::Runtime)?,
                actors: fetch(Dataset::Actors)?,
                directors: fetch(Dataset::Directors)?,
                genres: fetch(Dataset::Genres)?,
            })
        })();

        let datasets = match loaded {
            Ok(d) => d,
            Err(e) => {
                pb.abandon_with_message("load failed");
                return Err(e);
            }
        };

        let fetched = pending.iter().filter(|p| p.2 == Source::Network).count();
        pb.finish_with_message(format!("{fetched} fetched, {} cached", pending.len() - fetched));
        self.commit(pending);
        Ok(datasets)
    }

    fn lookup(&mut self, url: &str, refresh: bool) -> Result<(Value, Source), FetchError> {
        if !refresh {
            if let Some(body) = self.memo.get(url) {
                return Ok((body.clone(), Source::Memo));
            }
            if let Some(disk) = &self.disk {
                match disk.db.get_cached_response(url, disk.ttl) {
                    Ok(Some(body)) => return Ok((body, Source::Disk)),
                    Ok(None) => {}
                    Err(e) => log::warn!("Disk cache read failed for {url}: {e}"),
                }
            }
        }
        Ok((self.client.get_json(url)?, Source::Network))
    }

    fn commit(&mut self, pending: Vec<(String, Value, Source)>) {
        for (url, body, source) in pending {
            if source == Source::Network {
                if let Some(disk) = &self.disk {
                    if let Err(e) = disk.db.store_response(&url, &body) {
                        log::warn!("Disk cache write failed for {url}: {e}");
                    }
                }
            }
            if source != Source::Memo {
                self.memo.insert(url, body);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::recommend::tests::sample;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Serves canned bodies; any URL not present fails with 503.
    pub(crate) struct StubClient {
        pub bodies: HashMap<String, Value>,
        pub calls: Cell<usize>,
    }

    impl StubClient {
        pub(crate) fn serving(base_url: &str, datasets: &Datasets) -> Self {
            let bodies = Dataset::ALL
                .iter()
                .map(|d| {
                    let rows = serde_json::to_value(&datasets.get(*d).rows).unwrap();
                    (d.url(base_url), rows)
                })
                .collect();
            Self {
                bodies,
                calls: Cell::new(0),
            }
        }
    }

    impl HttpClient for StubClient {
        fn get_json(&self, url: &str) -> Result<Value, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.bodies.get(url).cloned().ok_or_else(|| FetchError::Request {
                url: url.to_string(),
                source: ureq::Error::StatusCode(503),
            })
        }
    }

    const BASE: &str = "http://localhost:8000";

    #[test]
    fn test_load_all_six() {
        let expected = sample();
        let mut loader = Loader::new(StubClient::serving(BASE, &expected));
        let got = loader.load(BASE, false).unwrap();
        assert_eq!(got, expected);
        assert_eq!(loader.client().calls.get(), 6);
        assert_eq!(loader.memo().len(), 6);
    }

    #[test]
    fn test_memo_hit_avoids_refetch() {
        let mut loader = Loader::new(StubClient::serving(BASE, &sample()));
        loader.load(BASE, false).unwrap();
        loader.load(BASE, false).unwrap();
        assert_eq!(loader.client().calls.get(), 6);
        loader.load(BASE, true).unwrap();
        assert_eq!(loader.client().calls.get(), 12);
    }

    #[test]
    fn test_failure_leaves_caches_untouched() {
        let mut client = StubClient::serving(BASE, &sample());
        client.bodies.remove(&Dataset::Genres.url(BASE));
        let db = Database::open_in_memory().unwrap();
        let mut loader = Loader::new(client).with_disk_cache(db, chrono::Duration::minutes(60));

        let err = loader.load(BASE, false).unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
        assert!(loader.memo().is_empty());
        let disk = &loader.disk.as_ref().unwrap().db;
        assert_eq!(disk.cache_stats().unwrap().entries, 0);
    }

    #[test]
    fn test_disk_cache_serves_next_session() {
        let expected = sample();
        let mut first = Loader::new(StubClient::serving(BASE, &expected))
            .with_disk_cache(Database::open_in_memory().unwrap(), chrono::Duration::minutes(60));
        first.load(BASE, false).unwrap();

        // Same database, fresh memo and a client that serves nothing
        let db = first.disk.take().unwrap().db;
        let empty = StubClient {
            bodies: HashMap::new(),
            calls: Cell::new(0),
        };
        let mut second = Loader::new(empty).with_disk_cache(db, chrono::Duration::minutes(60));
        assert_eq!(second.load(BASE, false).unwrap(), expected);
        assert_eq!(second.client().calls.get(), 0);
        assert_eq!(second.memo().len(), 6);
    }

    #[test]
    fn test_base_url_change_invalidates() {
        let data = sample();
        let mut client = StubClient::serving(BASE, &data);
        client.bodies.extend(StubClient::serving("http://other:9000", &data).bodies);
        let mut loader = Loader::new(client);

        loader.load(BASE, false).unwrap();
        loader.load("http://other:9000/", false).unwrap();
        assert_eq!(loader.client().calls.get(), 12);
        assert_eq!(loader.memo().base_url(), Some("http://other:9000"));
        assert_eq!(loader.memo().len(), 6);
    }

    #[test]
    fn test_failed_switch_drops_memo_but_not_disk() {
        let db = Database::open_in_memory().unwrap();
        let mut loader = Loader::new(StubClient::serving(BASE, &sample()))
            .with_disk_cache(db, chrono::Duration::minutes(60));
        loader.load(BASE, false).unwrap();
        assert_eq!(loader.memo().len(), 6);

        assert!(loader.load("http://elsewhere:9000", false).is_err());
        assert!(loader.memo().is_empty());
        assert_eq!(loader.memo().base_url(), Some("http://elsewhere:9000"));
        let disk = &loader.disk.as_ref().unwrap().db;
        assert_eq!(disk.cache_stats().unwrap().entries, 6);

        // Switching back is served from disk without the network
        loader.load(BASE, false).unwrap();
        assert_eq!(loader.client().calls.get(), 7);
    }

    #[test]
    fn test_non_array_body_is_shape_error() {
        let mut client = StubClient::serving(BASE, &sample());
        client
            .bodies
            .insert(Dataset::Monthly.url(BASE), serde_json::json!({"detail": "oops"}));
        let mut loader = Loader::new(client);
        let err = loader.load(BASE, false).unwrap_err();
        assert!(matches!(err, FetchError::Shape(TableError::NotAnArray { .. })));
        assert!(loader.memo().is_empty());
    }
}
