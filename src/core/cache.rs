//! Key/value cache with per-entry expiry, persisted as a JSON byte stream.
//!
//! The cache is meant for data that is cheap to lose: load errors are swallowed
//! and expired entries are dropped only at load time. It is not suitable for
//! long lived processes since `get` never re-checks expiry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{Read, Write};
use tracing::debug;

#[derive(Serialize, Deserialize)]
struct CacheEntry<K, V> {
    key: K,
    value: V,
    expires: i64,
}

struct CacheValue<V> {
    value: V,
    expires: i64,
}

pub struct Cache<K, V>
where
    K: Eq + Hash,
{
    inner: HashMap<K, CacheValue<V>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Debug + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Loads the cache from `reader`, dropping entries whose expire time is
    /// before `cutoff`. Any decoding error yields an empty cache.
    pub fn load<R: Read>(reader: R, cutoff: i64) -> Self {
        let entries: Vec<CacheEntry<K, V>> = match serde_json::from_reader(reader) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cache LOAD failed, starting empty: {}", e);
                return Self::new();
            }
        };

        let total = entries.len();
        let inner: HashMap<K, CacheValue<V>> = entries
            .into_iter()
            .filter(|entry| entry.expires >= cutoff)
            .map(|entry| {
                (
                    entry.key,
                    CacheValue {
                        value: entry.value,
                        expires: entry.expires,
                    },
                )
            })
            .collect();
        debug!(
            "Cache LOAD kept {} of {} entries (cutoff {})",
            inner.len(),
            total,
            cutoff
        );
        Self { inner }
    }

    /// Writes every entry to `writer`, expired or not.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let entries: Vec<CacheEntry<&K, &V>> = self
            .inner
            .iter()
            .map(|(key, item)| CacheEntry {
                key,
                value: &item.value,
                expires: item.expires,
            })
            .collect();
        serde_json::to_writer(&mut writer, &entries).context("Failed to encode cache")?;
        writer.flush().context("Failed to flush cache")?;
        debug!("Cache SAVE of {} entries", entries.len());
        Ok(())
    }

    pub fn set(&mut self, key: K, value: V, expires: i64) {
        debug!("Cache PUT for key: {:?}", key);
        self.inner.insert(key, CacheValue { value, expires });
    }

    /// Returns the value stored for `key`. Expiry is not checked.
    pub fn get(&self, key: &K) -> Option<&V> {
        match self.inner.get(key) {
            Some(item) => {
                debug!("Cache HIT for key: {:?}", key);
                Some(&item.value)
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Debug + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}
