use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};
use serde_json::Value;

use super::models::CacheStats;
use super::{Database, Result};

/// Timestamps are stored as fixed-width RFC 3339 UTC so they compare as text.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Database {
    /// Cached body for `url` if it was fetched within `max_age`.
    /// A body that no longer parses is treated as absent.
    pub fn get_cached_response(&self, url: &str, max_age: Duration) -> Result<Option<Value>> {
        let cutoff = timestamp(Utc::now() - max_age);
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM response_cache WHERE url = ?1 AND fetched_at >= ?2",
                params![url, cutoff],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(text) => match serde_json::from_str(&text) {
                Ok(v) => Ok(Some(v)),
                Err(e) => {
                    log::warn!("Discarding unreadable cached body for {url}: {e}");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Store (or replace) the body for `url`, stamped now.
    pub fn store_response(&self, url: &str, body: &Value) -> Result<()> {
        self.store_response_at(url, body, Utc::now())
    }

    pub fn store_response_at(&self, url: &str, body: &Value, fetched_at: DateTime<Utc>) -> Result<()> {
        let text = serde_json::to_string(body)?;
        self.conn.execute(
            "INSERT INTO response_cache (url, body, fetched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET
                body = excluded.body,
                fetched_at = excluded.fetched_at",
            params![url, text, timestamp(fetched_at)],
        )?;
        Ok(())
    }

    /// Delete every cached body. Returns the number of rows removed.
    pub fn clear_responses(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM response_cache", [])?)
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(body)), 0), MIN(fetched_at), MAX(fetched_at)
             FROM response_cache",
            [],
            |row| {
                Ok(CacheStats {
                    entries: row.get::<_, i64>(0)? as usize,
                    total_bytes: row.get::<_, i64>(1)? as usize,
                    oldest: row.get(2)?,
                    newest: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "http://localhost:8000/v1/movie/top-genres";

    #[test]
    fn test_store_and_get() {
        let db = Database::open_in_memory().unwrap();
        let body = json!([{"_id": "Drama", "totalMovies": 12000}]);
        db.store_response(URL, &body).unwrap();
        let got = db.get_cached_response(URL, Duration::minutes(5)).unwrap();
        assert_eq!(got, Some(body));
        assert_eq!(db.get_cached_response("http://other", Duration::minutes(5)).unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let db = Database::open_in_memory().unwrap();
        let old = Utc::now() - Duration::hours(3);
        db.store_response_at(URL, &json!([]), old).unwrap();
        assert_eq!(db.get_cached_response(URL, Duration::hours(1)).unwrap(), None);
        assert!(db.get_cached_response(URL, Duration::hours(4)).unwrap().is_some());
    }

    #[test]
    fn test_store_replaces() {
        let db = Database::open_in_memory().unwrap();
        db.store_response(URL, &json!([1])).unwrap();
        db.store_response(URL, &json!([2])).unwrap();
        assert_eq!(db.get_cached_response(URL, Duration::minutes(1)).unwrap(), Some(json!([2])));
        assert_eq!(db.cache_stats().unwrap().entries, 1);
    }

    #[test]
    fn test_unreadable_body_is_absent() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO response_cache (url, body, fetched_at) VALUES (?1, 'not json', ?2)",
                params![URL, timestamp(Utc::now())],
            )
            .unwrap();
        assert_eq!(db.get_cached_response(URL, Duration::minutes(1)).unwrap(), None);
    }

    #[test]
    fn test_stats_and_clear() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.cache_stats().unwrap(), CacheStats::default());
        db.store_response("a", &json!([])).unwrap();
        db.store_response("b", &json!([1, 2])).unwrap();
        let stats = db.cache_stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_bytes, "[]".len() + "[1,2]".len());
        assert!(stats.oldest.is_some());
        assert_eq!(db.clear_responses().unwrap(), 2);
        assert_eq!(db.cache_stats().unwrap().entries, 0);
    }
}
