//! Record loading and data resolution for the runner.
//!
//! Given a symbol and a date range, returns daily records. Fallback policy:
//! 1. If a cache entry for exactly this range exists → use it
//! 2. Otherwise, if a provider is available → fetch, cache, evict stale ranges
//! 3. If no data and `--synthetic` → generate a synthetic walk (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode. Results produced on it are
//! tagged in the backtest result.

use chrono::{Datelike, NaiveDate};
use fundlab_core::data::{CacheKey, DataError, DataKind, DataProvider, DataSource, JsonCache};
use fundlab_core::domain::{validate_records, MarketRecord};
use fundlab_core::signals::MacroObservation;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' in offline mode (use --synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no data for '{symbol}': {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how records are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Never consult the provider; the cache is the only source.
    pub offline: bool,
    /// Generate synthetic records when real data is unavailable.
    pub synthetic: bool,
    /// Skip the cache and go straight to the provider.
    pub force: bool,
}

/// Result of loading one symbol, including provenance.
#[derive(Debug)]
pub struct LoadedData {
    pub symbol: String,
    pub records: Vec<MarketRecord>,
    pub source: DataSource,
    /// BLAKE3 over every record, for fingerprinting.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load daily records for `symbol`, with fallback to provider or synthetic.
pub fn load_records(
    symbol: &str,
    kind: DataKind,
    cache: &JsonCache,
    provider: Option<&dyn DataProvider>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let key = CacheKey::new(symbol, opts.start, opts.end, kind);

    // Step 1: cache
    if !opts.force {
        match cache.load(&key) {
            Ok(records) => {
                info!(symbol, count = records.len(), "loaded records from cache");
                return Ok(loaded(symbol, records, DataSource::Cache));
            }
            Err(DataError::NoData { .. }) => {}
            Err(e) => warn!(symbol, error = %e, "cache unusable, falling back"),
        }
    }

    // Step 2: provider
    let mut failure = String::from("not cached and no provider configured");
    if !opts.offline {
        if let Some(provider) = provider {
            match provider.fetch(symbol, opts.start, opts.end) {
                Ok(records) => {
                    validate_records(&records)?;
                    cache.write(&key, &records)?;
                    let evicted = cache.evict_other_ranges(&key)?;
                    info!(
                        symbol,
                        provider = provider.name(),
                        count = records.len(),
                        evicted,
                        "fetched and cached records"
                    );
                    return Ok(loaded(symbol, records, DataSource::CsvImport));
                }
                Err(e) => {
                    failure = format!("{} provider failed: {e}", provider.name());
                }
            }
        }
    }

    // Step 3: synthetic
    if opts.synthetic {
        warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
        let records = generate_synthetic_records(symbol, opts.start, opts.end);
        if records.is_empty() {
            return Err(DataError::EmptySeries.into());
        }
        return Ok(loaded(symbol, records, DataSource::Synthetic));
    }

    // Step 4: fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline {
            symbol: symbol.to_string(),
        });
    }
    Err(LoadError::Unavailable {
        symbol: symbol.to_string(),
        reason: failure,
    })
}

fn loaded(symbol: &str, records: Vec<MarketRecord>, source: DataSource) -> LoadedData {
    LoadedData {
        symbol: symbol.to_string(),
        dataset_hash: compute_dataset_hash(&records),
        has_synthetic: source == DataSource::Synthetic,
        records,
        source,
    }
}

/// Read macro observations from a CSV with header
/// `date,bond_yield_10y,m1_growth,m2_growth,pmi,usd_index`. Empty cells are
/// missing values; dates must be strictly increasing.
pub fn load_macro_csv(path: &Path) -> Result<Vec<MacroObservation>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(DataError::from)?;
    let mut observations: Vec<MacroObservation> = Vec::new();
    for row in reader.deserialize::<MacroObservation>() {
        let obs = row.map_err(DataError::from)?;
        if let Some(prev) = observations.last() {
            if obs.date <= prev.date {
                return Err(DataError::NonMonotonic {
                    index: observations.len(),
                    previous: prev.date,
                    current: obs.date,
                }
                .into());
            }
        }
        observations.push(obs);
    }
    info!(path = %path.display(), count = observations.len(), "loaded macro observations");
    Ok(observations)
}

/// Deterministic BLAKE3 hash over dates and every numeric field.
pub fn compute_dataset_hash(records: &[MarketRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(r.date.to_string().as_bytes());
        hasher.update(&r.open.to_le_bytes());
        hasher.update(&r.high.to_le_bytes());
        hasher.update(&r.low.to_le_bytes());
        hasher.update(&r.close.to_le_bytes());
        hasher.update(&r.volume.to_le_bytes());
        hasher.update(&r.amount.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk from 100.0 on weekdays, for development only.
///
/// Turnover is loosely tied to the size of the daily move so the sentiment
/// dimension has something to react to.
pub fn generate_synthetic_records(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<MarketRecord> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut records = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000.0_f64..5_000_000.0) * (1.0 + 20.0 * daily_return.abs());

        records.push(MarketRecord {
            date: current,
            open,
            high,
            low,
            close,
            volume,
            amount: volume * close,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlab_core::data::CsvProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts(offline: bool, synthetic: bool) -> LoadOptions {
        LoadOptions {
            start: d(2024, 1, 1),
            end: d(2024, 12, 31),
            offline,
            synthetic,
            force: false,
        }
    }

    fn sample_records() -> Vec<MarketRecord> {
        vec![
            MarketRecord::close_amount(d(2024, 1, 2), 10.0, 1_000.0),
            MarketRecord::close_amount(d(2024, 1, 3), 10.5, 1_200.0),
        ]
    }

    fn write_csv(dir: &Path, symbol: &str) {
        std::fs::write(
            dir.join(format!("{symbol}.csv")),
            "date,open,high,low,close,volume,amount\n\
             2024-01-02,9.9,10.1,9.8,10.0,100,1000\n\
             2024-01-03,10.0,10.6,9.9,10.5,110,1200\n",
        )
        .unwrap();
    }

    #[test]
    fn load_from_cache_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());
        let key = CacheKey::new("510300", d(2024, 1, 1), d(2024, 12, 31), DataKind::Market);
        cache.write(&key, &sample_records()).unwrap();

        let loaded = load_records("510300", DataKind::Market, &cache, None, &opts(false, false))
            .unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.source, DataSource::Cache);
        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.dataset_hash.len(), 64);
    }

    #[test]
    fn provider_result_is_cached() {
        let csv_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write_csv(csv_dir.path(), "510300");
        let provider = CsvProvider::new(csv_dir.path());
        let cache = JsonCache::new(cache_dir.path());

        let first = load_records(
            "510300",
            DataKind::Market,
            &cache,
            Some(&provider),
            &opts(false, false),
        )
        .unwrap();
        assert_eq!(first.source, DataSource::CsvImport);

        let second = load_records(
            "510300",
            DataKind::Market,
            &cache,
            Some(&provider),
            &opts(false, false),
        )
        .unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(first.dataset_hash, second.dataset_hash);
    }

    #[test]
    fn offline_no_cache_fails_without_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());
        let err = load_records("510300", DataKind::Market, &cache, None, &opts(true, false))
            .unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { .. }));
        assert!(err.to_string().contains("no cached data"));
    }

    #[test]
    fn missing_provider_file_reports_reason() {
        let csv_dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(csv_dir.path());
        let cache = JsonCache::new(cache_dir.path());
        let err = load_records(
            "MISSING",
            DataKind::Market,
            &cache,
            Some(&provider),
            &opts(false, false),
        )
        .unwrap_err();
        assert!(err.to_string().contains("csv provider failed"));
    }

    #[test]
    fn synthetic_fallback_produces_tagged_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonCache::new(dir.path());
        let loaded =
            load_records("FAKE", DataKind::Market, &cache, None, &opts(true, true)).unwrap();
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.source, DataSource::Synthetic);
        assert!(!loaded.records.is_empty());
        validate_records(&loaded.records).unwrap();
    }

    #[test]
    fn synthetic_data_is_deterministic_per_symbol() {
        let a = generate_synthetic_records("510300", d(2024, 1, 1), d(2024, 1, 31));
        let b = generate_synthetic_records("510300", d(2024, 1, 1), d(2024, 1, 31));
        let c = generate_synthetic_records("159915", d(2024, 1, 1), d(2024, 1, 31));

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.date, y.date);
            assert_eq!(x.close, y.close);
        }
        assert_eq!(a.len(), c.len());
        assert_ne!(a[0].close, c[0].close);
        assert!(a.iter().all(|r| r.date.weekday().number_from_monday() <= 5));
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let records = sample_records();
        let mut changed = records.clone();
        changed[1].close = 10.6;
        assert_eq!(compute_dataset_hash(&records), compute_dataset_hash(&records));
        assert_ne!(compute_dataset_hash(&records), compute_dataset_hash(&changed));
    }

    #[test]
    fn macro_csv_allows_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.csv");
        std::fs::write(
            &path,
            "date,bond_yield_10y,m1_growth,m2_growth,pmi,usd_index\n\
             2024-01-02,2.55,,,,102.1\n\
             2024-01-31,2.50,5.9,8.7,49.2,103.0\n",
        )
        .unwrap();
        let obs = load_macro_csv(&path).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].m1_growth, None);
        assert_eq!(obs[0].bond_yield_10y, Some(2.55));
        assert_eq!(obs[1].pmi, Some(49.2));
    }

    #[test]
    fn macro_csv_rejects_unsorted_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.csv");
        std::fs::write(
            &path,
            "date,bond_yield_10y,m1_growth,m2_growth,pmi,usd_index\n\
             2024-02-01,2.5,,,,\n\
             2024-01-01,2.6,,,,\n",
        )
        .unwrap();
        let err = load_macro_csv(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Data(DataError::NonMonotonic { index: 1, .. })
        ));
    }
}
