//! Time-to-live disk cache for remote fetch results.
//!
//! Each cached call lives in `<dir>/<namespace>_<args joined by "_">.json`.
//! A file is fresh while `now < mtime + ttl`; a fresh file is returned
//! without invoking the fetch, a stale or missing one is overwritten by the
//! next successful fetch. Nothing is ever deleted and there is no locking:
//! concurrent writers of one key race and the last write wins.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};

use super::Result;

/// Separator between stringified call arguments in a cache key.
const KEY_SEPARATOR: &str = "_";

/// Disk cache for one namespace (`ticker`, `dividends`, `prices`, ...).
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    namespace: String,
    ttl: Duration,
}

impl DiskCache {
    /// Create a cache rooted at `dir` for `namespace`.
    pub fn new(dir: impl Into<PathBuf>, namespace: impl Into<String>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            namespace: namespace.into(),
            ttl,
        }
    }

    /// Join call arguments into a key.
    pub fn key<S: AsRef<str>>(args: &[S]) -> String {
        args.iter()
            .map(|a| a.as_ref())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    /// File holding the result for `args`.
    pub fn path_for<S: AsRef<str>>(&self, args: &[S]) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.namespace, Self::key(args)))
    }

    /// Read the entry at `path` if it exists and is still fresh.
    ///
    /// A missing file is a miss. A file that exists but cannot be read or
    /// parsed is an error.
    async fn read_fresh<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            _ => return Ok(None),
        };

        let modified: DateTime<Utc> = metadata.modified()?.into();
        if !is_fresh(modified, Utc::now(), self.ttl) {
            return Ok(None);
        }

        let content = tokio::fs::read(path).await?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Return the cached result for `args`, or run `fetch` and cache its result.
    ///
    /// A failed fetch writes nothing and its error is returned unchanged.
    pub async fn get_or_fetch<T, S, F, Fut>(&self, args: &[S], fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let path = self.path_for(args);

        if let Some(cached) = self.read_fresh(&path).await? {
            tracing::debug!(path = %path.display(), "Cache hit");
            return Ok(cached);
        }

        tracing::debug!(path = %path.display(), "Fetching from source");
        let value = fetch().await?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, serde_json::to_vec_pretty(&value)?).await?;

        Ok(value)
    }
}

/// An entry written at `modified` is fresh at `now` iff `now < modified + ttl`.
pub(crate) fn is_fresh(modified: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match modified.checked_add_signed(ttl) {
        Some(expires_at) => now < expires_at,
        None => true,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn day() -> Duration {
        Duration::hours(24)
    }

    #[test]
    fn test_key_and_path() {
        let cache = DiskCache::new("/tmp/c", "prices", day());
        assert_eq!(DiskCache::key(&["AAPL", "1mo"]), "AAPL_1mo");
        assert_eq!(
            cache.path_for(&["AAPL", "1mo"]),
            PathBuf::from("/tmp/c/prices_AAPL_1mo.json")
        );
        assert_ne!(cache.path_for(&["AAPL", "1mo"]), cache.path_for(&["AAPL", "1d"]));
    }

    #[test]
    fn test_freshness_boundary() {
        let written = Utc::now();
        assert!(is_fresh(written, written + Duration::hours(23), day()));
        assert!(!is_fresh(written, written + day(), day()));
        assert!(!is_fresh(written, written + Duration::hours(25), day()));
        assert!(!is_fresh(written, written, Duration::zero()));
    }

    #[tokio::test]
    async fn test_fetches_once_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), "ticker", day());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let value: Value = cache
                .get_or_fetch(&["AAPL"], move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"symbol": "AAPL"}))
                })
                .await
                .unwrap();
            assert_eq!(value["symbol"], "AAPL");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dir.path().join("ticker_AAPL.json").is_file());
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), "ticker", Duration::zero());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        for expected in 1..=2 {
            let _: Value = cache
                .get_or_fetch(&["AAPL"], move || async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(json!({ "call": n }))
                })
                .await
                .unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), expected);
        }

        let stored: Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("ticker_AAPL.json")).unwrap())
                .unwrap();
        assert_eq!(stored["call"], 2);
    }

    #[tokio::test]
    async fn test_distinct_args_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), "prices", day());
        let calls = AtomicU32::new(0);
        let counter = &calls;

        for args in [["AAPL", "1mo"], ["AAPL", "1d"], ["AAPL", "1mo"]] {
            let _: Value = cache
                .get_or_fetch(&args, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!([]))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(dir.path().join("prices_AAPL_1mo.json").is_file());
        assert!(dir.path().join("prices_AAPL_1d.json").is_file());
    }

    #[tokio::test]
    async fn test_failed_fetch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"), "dividends", day());

        let result: Result<Value> = cache
            .get_or_fetch(&["VOD.L"], || async {
                Err(DataError::MissingData("Company VOD.L is not paying dividends".into()))
            })
            .await;

        assert!(matches!(result, Err(DataError::MissingData(_))));
        assert!(!dir.path().join("nested").join("dividends_VOD.L.json").exists());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("a").join("b"), "ticker", day());

        let _: Value = cache
            .get_or_fetch(&["MSFT"], || async { Ok(json!({})) })
            .await
            .unwrap();

        assert!(dir.path().join("a/b/ticker_MSFT.json").is_file());
    }

    #[tokio::test]
    async fn test_corrupt_entry_propagates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ticker_BAD.json"), b"{ not json").unwrap();
        let cache = DiskCache::new(dir.path(), "ticker", day());

        let result: Result<Value> = cache
            .get_or_fetch(&["BAD"], || async { Ok(json!({})) })
            .await;

        assert!(matches!(result, Err(DataError::Json(_))));
    }
}
