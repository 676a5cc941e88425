//! Record store with a local JSON cache fallback.
//!
//! Form records live in a remote table. When the remote is unreachable,
//! reads come from and writes go to `<cache_dir>/<table>.json`, so forms
//! stay usable offline.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A persisted form record.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Unique record id
    fn id(&self) -> &str;

    /// Owning user, if any
    fn owner_id(&self) -> Option<&str>;
}

/// Remote table access.
#[async_trait]
pub trait RemoteTable<T: Record>: Send + Sync {
    /// Fetch records visible to `owner_id` (all records when privileged).
    async fn fetch(&self, owner_id: Option<&str>, privileged: bool) -> Result<Vec<T>>;

    /// Insert or update one record.
    async fn upsert(&self, record: &T) -> Result<()>;
}

/// Read/write access to one table of records.
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    /// Records owned by `owner_id`, or every record when `privileged`.
    async fn get_all(&self, owner_id: Option<&str>, privileged: bool) -> Result<Vec<T>>;

    /// Persist a record.
    async fn save(&self, record: &T) -> Result<()>;
}

/// [`RecordStore`] that prefers the remote table and falls back to a JSON
/// cache file named after the table.
pub struct CachedRecordStore<R> {
    remote: R,
    table: String,
    cache_dir: PathBuf,
}

impl<R> CachedRecordStore<R> {
    /// Create a store for `table`, caching under `cache_dir`.
    pub fn new(remote: R, table: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            table: table.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Path of the cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.table))
    }

    fn read_cache<T: Record>(&self) -> Result<Vec<T>> {
        let path = self.cache_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_cache<T: Record>(&self, records: &[T]) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        write_json(&self.cache_path(), records)
    }

    fn upsert_cache<T: Record>(&self, record: &T) -> Result<()> {
        let mut records: Vec<T> = self.read_cache()?;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.write_cache(&records)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    std::fs::write(path, data)?;
    Ok(())
}

fn visible<T: Record>(records: Vec<T>, owner_id: Option<&str>, privileged: bool) -> Vec<T> {
    if privileged {
        return records;
    }
    records
        .into_iter()
        .filter(|r| owner_id.is_none() || r.owner_id() == owner_id)
        .collect()
}

#[async_trait]
impl<T, R> RecordStore<T> for CachedRecordStore<R>
where
    T: Record + 'static,
    R: RemoteTable<T>,
{
    async fn get_all(&self, owner_id: Option<&str>, privileged: bool) -> Result<Vec<T>> {
        match self.remote.fetch(owner_id, privileged).await {
            Ok(records) => {
                // Only a full listing may replace the cache
                if privileged || owner_id.is_none() {
                    if let Err(e) = self.write_cache(&records) {
                        log::warn!("could not refresh {} cache: {}", self.table, e);
                    }
                }
                Ok(records)
            }
            Err(remote) => {
                log::warn!("{}: remote fetch failed ({}), using cache", self.table, remote);
                let cached = self
                    .read_cache()
                    .map_err(|e| Error::Store(format!("{}: {}; cache: {}", self.table, remote, e)))?;
                Ok(visible(cached, owner_id, privileged))
            }
        }
    }

    async fn save(&self, record: &T) -> Result<()> {
        let remote = self.remote.upsert(record).await;
        if let Err(e) = &remote {
            log::warn!("{}: remote save failed ({}), keeping record in cache", self.table, e);
        }
        self.upsert_cache(record).map_err(|cache| match remote {
            Ok(()) => cache,
            Err(remote) => Error::Store(format!("{}: {}; cache: {}", self.table, remote, cache)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Report {
        id: String,
        owner: Option<String>,
        pozo: String,
    }

    impl Record for Report {
        fn id(&self) -> &str {
            &self.id
        }

        fn owner_id(&self) -> Option<&str> {
            self.owner.as_deref()
        }
    }

    fn report(id: &str, owner: &str) -> Report {
        Report {
            id: id.into(),
            owner: Some(owner.into()),
            pozo: "YPF-1".into(),
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        offline: AtomicBool,
        rows: Mutex<Vec<Report>>,
    }

    #[async_trait]
    impl RemoteTable<Report> for FakeRemote {
        async fn fetch(&self, owner_id: Option<&str>, privileged: bool) -> Result<Vec<Report>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Other("offline".into()));
            }
            let rows = self.rows.lock().unwrap().clone();
            Ok(visible(rows, owner_id, privileged))
        }

        async fn upsert(&self, record: &Report) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Other("offline".into()));
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_online_save_and_read() {
        let dir = tempdir().unwrap();
        let store = CachedRecordStore::new(FakeRemote::default(), "parte_diario", dir.path());
        store.save(&report("1", "ana")).await.unwrap();
        let all: Vec<Report> = store.get_all(None, true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(store.cache_path().exists());
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_cache() {
        let dir = tempdir().unwrap();
        let store = CachedRecordStore::new(FakeRemote::default(), "parte_diario", dir.path());
        store.save(&report("1", "ana")).await.unwrap();
        store.save(&report("2", "luis")).await.unwrap();

        store.remote.offline.store(true, Ordering::SeqCst);
        store.save(&report("3", "ana")).await.unwrap();

        let mine: Vec<Report> = store.get_all(Some("ana"), false).await.unwrap();
        let ids: Vec<&str> = mine.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let all: Vec<Report> = store.get_all(Some("ana"), true).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_cache_file_holds_record_list() {
        let dir = tempdir().unwrap();
        let store = CachedRecordStore::new(FakeRemote::default(), "parte_diario", dir.path());
        store.save(&report("1", "ana")).await.unwrap();
        store.save(&report("1", "luis")).await.unwrap();

        let data = std::fs::read_to_string(store.cache_path()).unwrap();
        let cached: Vec<Report> = serde_json::from_str(&data).unwrap();
        assert_eq!(cached, vec![report("1", "luis")]);
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_empty() {
        let dir = tempdir().unwrap();
        let remote = FakeRemote::default();
        remote.offline.store(true, Ordering::SeqCst);
        let store = CachedRecordStore::new(remote, "permisos", dir.path());
        let records: Vec<Report> = store.get_all(None, false).await.unwrap();
        assert!(records.is_empty());
    }
}
