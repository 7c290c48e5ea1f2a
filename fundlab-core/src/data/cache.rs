//! JSON cache keyed by (symbol, date range, data kind).
//!
//! Layout: `{cache_dir}/{kind}_{SYMBOL}_{start}_{end}.json` plus a
//! `.meta.json` sidecar holding a BLAKE3 hash of the payload.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity check on load (hash must match the sidecar)
//! - Quarantine for corrupt files ({filename}.quarantined)
//! - Eviction of other date ranges for the same symbol
//!
//! Freshness policy is the caller's concern; the cache only stores and
//! returns exactly what it was given.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{DataError, DataKind};
use crate::domain::MarketRecord;

/// Identity of a cached series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: DataKind,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: NaiveDate, kind: DataKind) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            kind,
        }
    }

    fn prefix(kind: DataKind, symbol: &str) -> String {
        format!("{}_{symbol}_", kind.as_str())
    }

    fn file_stem(&self) -> String {
        format!(
            "{}{}_{}",
            Self::prefix(self.kind, &self.symbol),
            self.start,
            self.end
        )
    }
}

/// Metadata sidecar for a cached entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub kind: DataKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: usize,
    pub data_hash: String,
    pub cached_at: chrono::NaiveDateTime,
}

/// On-disk row. JSON has no NaN, so missing numbers are stored as null.
#[derive(Debug, Serialize, Deserialize)]
struct CachedRecord {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    amount: Option<f64>,
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

impl From<&MarketRecord> for CachedRecord {
    fn from(r: &MarketRecord) -> Self {
        Self {
            date: r.date,
            open: finite(r.open),
            high: finite(r.high),
            low: finite(r.low),
            close: finite(r.close),
            volume: finite(r.volume),
            amount: finite(r.amount),
        }
    }
}

impl From<CachedRecord> for MarketRecord {
    fn from(c: CachedRecord) -> Self {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        MarketRecord {
            date: c.date,
            open: nan(c.open),
            high: nan(c.high),
            low: nan(c.low),
            close: nan(c.close),
            volume: nan(c.volume),
            amount: nan(c.amount),
        }
    }
}

/// Every file name a cache entry can own, longest suffix first.
const ENTRY_SUFFIXES: [&str; 4] = [".meta.json", ".json.quarantined", ".json.tmp", ".json"];

/// Date range of a cache file belonging to `prefix`. The remainder after
/// the prefix must be exactly `{start}_{end}` plus an entry suffix, so a
/// symbol that merely starts with another one (`SH` vs `SH_ETF`) never
/// matches.
fn entry_range(name: &str, prefix: &str) -> Option<(NaiveDate, NaiveDate)> {
    let rest = name.strip_prefix(prefix)?;
    let stem = ENTRY_SUFFIXES.iter().find_map(|s| rest.strip_suffix(s))?;
    let (start, end) = stem.split_once('_')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// File-backed JSON cache.
pub struct JsonCache {
    cache_dir: PathBuf,
}

impl JsonCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.file_stem()))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json", key.file_stem()))
    }

    /// Store records under `key`, replacing any previous entry.
    pub fn write(&self, key: &CacheKey, records: &[MarketRecord]) -> Result<(), DataError> {
        if records.is_empty() {
            return Err(DataError::CacheError("no records to cache".into()));
        }
        fs::create_dir_all(&self.cache_dir)?;

        let rows: Vec<CachedRecord> = records.iter().map(CachedRecord::from).collect();
        let payload = serde_json::to_vec(&rows)
            .map_err(|e| DataError::CacheError(format!("serialization: {e}")))?;

        let path = self.data_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &payload)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: key.symbol.clone(),
            kind: key.kind,
            start_date: key.start,
            end_date: key.end,
            record_count: records.len(),
            data_hash: blake3::hash(&payload).to_hex().to_string(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(key), meta_json)?;
        Ok(())
    }

    /// Load the entry for `key`. A corrupt entry is quarantined and reported
    /// as a cache error; a missing one as `NoData`.
    pub fn load(&self, key: &CacheKey) -> Result<Vec<MarketRecord>, DataError> {
        let path = self.data_path(key);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: key.symbol.clone(),
            });
        }
        let payload = fs::read(&path)?;

        let check = self
            .get_meta(key)
            .ok_or_else(|| "missing metadata sidecar".to_string())
            .and_then(|meta| {
                let hash = blake3::hash(&payload).to_hex().to_string();
                if hash == meta.data_hash {
                    Ok(())
                } else {
                    Err("hash mismatch".to_string())
                }
            })
            .and_then(|()| {
                serde_json::from_slice::<Vec<CachedRecord>>(&payload).map_err(|e| e.to_string())
            });

        match check {
            Ok(rows) => Ok(rows.into_iter().map(MarketRecord::from).collect()),
            Err(reason) => {
                let quarantine = path.with_extension("json.quarantined");
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "quarantining corrupt cache file"
                );
                let _ = fs::rename(&path, &quarantine);
                Err(DataError::CacheError(format!(
                    "corrupt cache entry {}: {reason}",
                    path.display()
                )))
            }
        }
    }

    /// Metadata for a cached entry, if present and readable.
    pub fn get_meta(&self, key: &CacheKey) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// All readable metadata sidecars in the cache directory.
    pub fn entries(&self) -> Vec<CacheMeta> {
        let Ok(dir) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        let mut metas: Vec<CacheMeta> = dir
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".meta.json"))
            .filter_map(|e| fs::read_to_string(e.path()).ok())
            .filter_map(|s| serde_json::from_str(&s).ok())
            .collect();
        metas.sort_by(|a: &CacheMeta, b: &CacheMeta| {
            (a.symbol.as_str(), a.start_date).cmp(&(b.symbol.as_str(), b.start_date))
        });
        metas
    }

    /// Remove every entry for `keep.symbol`/`keep.kind` except `keep` itself.
    ///
    /// Returns the number of files removed.
    pub fn evict_other_ranges(&self, keep: &CacheKey) -> Result<usize, DataError> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        let prefix = CacheKey::prefix(keep.kind, &keep.symbol);
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            match entry_range(&name, &prefix) {
                Some(range) if range != (keep.start, keep.end) => {}
                _ => continue,
            }
            fs::remove_file(entry.path())?;
            tracing::debug!(file = %name, "evicted cache file");
            removed += 1;
        }
        Ok(removed)
    }
}
