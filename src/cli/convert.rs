use super::args::{self, Request};
use crate::core::{Cache, Clock, CurrencyPair, CurrencyRateProvider, Storage};
use chrono::Duration;
use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type RateCache = Cache<CurrencyPair, f64>;

/// Cache-first conversion: rates are looked up in the persisted cache and only
/// fetched from the provider on a miss.
pub struct Converter {
    provider: Arc<dyn CurrencyRateProvider>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    cache_lifetime: Duration,
}

impl Converter {
    pub fn new(
        provider: Arc<dyn CurrencyRateProvider>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        cache_lifetime: Duration,
    ) -> Self {
        Self {
            provider,
            storage,
            clock,
            cache_lifetime,
        }
    }

    /// Parses `args` (program name first) and converts. Returns the exit code.
    pub async fn run<I, T>(&self, args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match args::parse_arguments(args) {
            Ok(cli) => self.convert(&cli.request(), out, err).await,
            Err(e) => args::report_parse_error(&e, out, err),
        }
    }

    pub async fn convert(&self, request: &Request, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.cache_lifetime)
            .map_or(i64::MIN, |t| t.timestamp());
        let mut cache = self.load_cache(cutoff);

        let key = CurrencyPair::new(&request.from, &request.to);
        // A stored zero is indistinguishable from a miss
        let rate = match cache.get(&key).copied() {
            Some(rate) if rate != 0.0 => rate,
            _ => {
                info!("Fetching rate for {}", key);
                let rate = match self.provider.get_rate(&key.from, &key.to).await {
                    Ok(rate) => rate,
                    Err(e) => {
                        let _ = writeln!(err, "{e}");
                        return 1;
                    }
                };
                cache.set(key, rate, now.timestamp());
                self.save_cache(&cache);
                rate
            }
        };

        let _ = writeln!(out, "{:.2}", rate * request.amount);
        0
    }

    fn load_cache(&self, cutoff: i64) -> RateCache {
        match self.storage.reader() {
            Ok(reader) => RateCache::load(reader, cutoff),
            Err(e) => {
                debug!("No cache available: {:#}", e);
                RateCache::load(io::empty(), cutoff)
            }
        }
    }

    fn save_cache(&self, cache: &RateCache) {
        let result = self
            .storage
            .writer()
            .and_then(|writer| cache.save(writer));
        if let Err(e) = result {
            warn!(
                location = %self.storage.location(),
                "failed to save to cache: {:#}", e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;
    use crate::store::MemoryStorage;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRateProvider {
        rate: f64,
        call_count: AtomicUsize,
    }

    impl FixedRateProvider {
        fn new(rate: f64) -> Arc<Self> {
            Arc::new(Self {
                rate,
                call_count: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for FixedRateProvider {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.rate < 0.0 {
                return Err(anyhow!("negative rates are not a thing"));
            }
            Ok(self.rate)
        }
    }

    fn converter(provider: Arc<FixedRateProvider>, storage: MemoryStorage, now: i64) -> Converter {
        Converter::new(
            provider,
            Arc::new(storage),
            Arc::new(FixedClock::from_timestamp(now)),
            Duration::hours(1),
        )
    }

    fn seeded_storage(rate: f64, stored_at: i64) -> MemoryStorage {
        let mut cache = RateCache::new();
        cache.set(CurrencyPair::new("USD", "AUD"), rate, stored_at);
        let mut buf = Vec::new();
        cache.save(&mut buf).unwrap();
        MemoryStorage::with_content(&buf)
    }

    async fn run(converter: &Converter, args: &[&str]) -> (i32, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = converter.run(args, &mut out, &mut err).await;
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_skips_provider() {
        let provider = FixedRateProvider::new(2.0);
        let now = 1_000_000;
        let converter = converter(provider.clone(), seeded_storage(3.0, now - 60), now);

        let (code, out, err) = run(&converter, &["fiatconv", "5", "usd", "aud"]).await;
        assert_eq!((code, out.as_str(), err.as_str()), (0, "15.00\n", ""));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_is_refetched() {
        let provider = FixedRateProvider::new(2.0);
        let now = 1_000_000;
        let converter = converter(provider.clone(), seeded_storage(3.0, now - 3601), now);

        let (code, out, _) = run(&converter, &["fiatconv", "5", "USD", "AUD"]).await;
        assert_eq!((code, out.as_str()), (0, "10.00\n"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_entry_exactly_at_cutoff_is_kept() {
        let provider = FixedRateProvider::new(2.0);
        let now = 1_000_000;
        let converter = converter(provider.clone(), seeded_storage(3.0, now - 3600), now);

        let (_, out, _) = run(&converter, &["fiatconv", "1", "USD", "AUD"]).await;
        assert_eq!(out, "3.00\n");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_zero_rate_counts_as_miss() {
        let provider = FixedRateProvider::new(2.0);
        let now = 1_000_000;
        let converter = converter(provider.clone(), seeded_storage(0.0, now), now);

        let (code, out, _) = run(&converter, &["fiatconv", "5", "USD", "AUD"]).await;
        assert_eq!((code, out.as_str()), (0, "10.00\n"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_reverse_direction_is_a_separate_entry() {
        let provider = FixedRateProvider::new(0.5);
        let now = 1_000_000;
        let converter = converter(provider.clone(), seeded_storage(2.0, now), now);

        let (_, out, _) = run(&converter, &["fiatconv", "4", "AUD", "USD"]).await;
        assert_eq!(out, "2.00\n");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_cache_untouched() {
        let provider = FixedRateProvider::new(-1.0);
        let storage = MemoryStorage::new();
        let converter = converter(provider.clone(), storage.clone(), 1_000_000);

        let (code, out, err) = run(&converter, &["fiatconv", "5", "USD", "AUD"]).await;
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(err, "negative rates are not a thing\n");
        assert!(storage.content().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_ignored_and_replaced() {
        let provider = FixedRateProvider::new(2.0);
        let storage = MemoryStorage::with_content(b"definitely not json");
        let converter = converter(provider.clone(), storage.clone(), 1_000_000);

        let (code, out, _) = run(&converter, &["fiatconv", "5", "USD", "AUD"]).await;
        assert_eq!((code, out.as_str()), (0, "10.00\n"));

        let saved = storage.content().unwrap();
        let cache = RateCache::load(saved.as_slice(), 0);
        assert_eq!(cache.get(&CurrencyPair::new("USD", "AUD")), Some(&2.0));
    }

    #[tokio::test]
    async fn test_negative_amount_passes_through() {
        let provider = FixedRateProvider::new(2.0);
        let converter = converter(provider.clone(), MemoryStorage::new(), 1_000_000);

        let (code, out, _) = run(&converter, &["fiatconv", "-5", "USD", "AUD"]).await;
        assert_eq!((code, out.as_str()), (0, "-10.00\n"));
    }

    #[tokio::test]
    async fn test_parse_failure_does_no_io() {
        let provider = FixedRateProvider::new(2.0);
        let storage = MemoryStorage::new();
        let converter = converter(provider.clone(), storage.clone(), 1_000_000);

        let (code, out, err) = run(&converter, &["fiatconv", "5", "DOLLAR", "AUD"]).await;
        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert!(err.contains("Invalid fiat: DOLLAR"));
        assert_eq!(provider.calls(), 0);
        assert!(storage.content().is_none());
    }
}
