//! Process-local store used for dry runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::{Connector, Store, StoreResult};
use crate::config::Config;
use crate::error::StoreError;

#[derive(Debug, Clone)]
enum Entry {
    Str(String),
    List(Vec<String>),
    Hash(HashMap<String, String>),
}

/// In-memory keyspace with strings, lists and hashes. Clones share the same
/// data, so a test can keep a handle and inspect what a run left behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    keyspace: Arc<Mutex<HashMap<String, Entry>>>,
}

/// Resolves a possibly negative `start..=stop` range against a list of
/// `len` elements. `None` means the range selects nothing.
fn bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn non_empty<T>(items: &[T], what: &str) -> StoreResult<()> {
    if items.is_empty() {
        return Err(StoreError::InvalidArgument(format!("at least one {} is required", what)));
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn keyspace(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.keyspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keyspace().contains_key(key)
    }
}

impl Store for MemoryStore {
    async fn ping(&mut self) -> StoreResult<String> {
        Ok("PONG".to_string())
    }

    async fn set(&mut self, key: &str, value: &str) -> StoreResult<String> {
        if key.is_empty() {
            return Err(StoreError::InvalidArgument("key must not be empty".to_string()));
        }
        self.keyspace()
            .insert(key.to_string(), Entry::Str(value.to_string()));
        Ok("OK".to_string())
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        match self.keyspace().get(key) {
            Some(Entry::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    async fn mget(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        non_empty(keys, "key")?;
        let keyspace = self.keyspace();
        // non-string keys read as absent, matching MGET
        Ok(keys
            .iter()
            .map(|key| match keyspace.get(key) {
                Some(Entry::Str(value)) => Some(value.clone()),
                _ => None,
            })
            .collect())
    }

    async fn del(&mut self, keys: &[String]) -> StoreResult<i64> {
        non_empty(keys, "key")?;
        let mut keyspace = self.keyspace();
        let removed = keys
            .iter()
            .filter(|key| keyspace.remove(key.as_str()).is_some())
            .count();
        Ok(removed as i64)
    }

    async fn rpush(&mut self, key: &str, values: &[String]) -> StoreResult<i64> {
        non_empty(values, "value")?;
        let mut keyspace = self.keyspace();
        let entry = keyspace
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()));
        match entry {
            Entry::List(list) => {
                list.extend(values.iter().cloned());
                Ok(list.len() as i64)
            }
            _ => Err(StoreError::WrongType),
        }
    }

    async fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        match self.keyspace().get(key) {
            Some(Entry::List(list)) => Ok(bounds(list.len(), start, stop)
                .map(|(start, stop)| list[start..=stop].to_vec())
                .unwrap_or_default()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(Vec::new()),
        }
    }

    async fn llen(&mut self, key: &str) -> StoreResult<i64> {
        match self.keyspace().get(key) {
            Some(Entry::List(list)) => Ok(list.len() as i64),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(0),
        }
    }

    async fn ltrim(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<String> {
        let mut keyspace = self.keyspace();
        let emptied = match keyspace.get_mut(key) {
            Some(Entry::List(list)) => {
                match bounds(list.len(), start, stop) {
                    Some((start, stop)) => {
                        list.truncate(stop + 1);
                        list.drain(..start);
                    }
                    None => list.clear(),
                }
                list.is_empty()
            }
            Some(_) => return Err(StoreError::WrongType),
            None => false,
        };

        if emptied {
            keyspace.remove(key);
        }
        Ok("OK".to_string())
    }

    async fn hset(&mut self, key: &str, fields: &[(String, String)]) -> StoreResult<i64> {
        non_empty(fields, "field")?;
        let mut keyspace = self.keyspace();
        let entry = keyspace
            .entry(key.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        match entry {
            Entry::Hash(hash) => {
                let created = fields
                    .iter()
                    .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
                    .count();
                Ok(created as i64)
            }
            _ => Err(StoreError::WrongType),
        }
    }

    async fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        match self.keyspace().get(key) {
            Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    async fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        match self.keyspace().get(key) {
            Some(Entry::Hash(hash)) => Ok(hash
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn hexists(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        match self.keyspace().get(key) {
            Some(Entry::Hash(hash)) => Ok(hash.contains_key(field)),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(false),
        }
    }

    async fn hlen(&mut self, key: &str) -> StoreResult<i64> {
        match self.keyspace().get(key) {
            Some(Entry::Hash(hash)) => Ok(hash.len() as i64),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(0),
        }
    }

    async fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<i64> {
        non_empty(fields, "field")?;
        let mut keyspace = self.keyspace();
        let (removed, emptied) = match keyspace.get_mut(key) {
            Some(Entry::Hash(hash)) => {
                let removed = fields
                    .iter()
                    .filter(|field| hash.remove(field.as_str()).is_some())
                    .count();
                (removed, hash.is_empty())
            }
            Some(_) => return Err(StoreError::WrongType),
            None => (0, false),
        };

        if emptied {
            keyspace.remove(key);
        }
        Ok(removed as i64)
    }
}

/// Hands out handles to one shared [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }
}

impl Connector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(&self, config: &Config) -> StoreResult<MemoryStore> {
        debug!("Using in-memory store in place of {}", config);
        Ok(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bounds_handles_negative_and_overflowing_indices() {
        assert_eq!(bounds(10, 0, -1), Some((0, 9)));
        assert_eq!(bounds(10, 2, -1), Some((2, 9)));
        assert_eq!(bounds(10, -2, -1), Some((8, 9)));
        assert_eq!(bounds(10, -100, 3), Some((0, 3)));
        assert_eq!(bounds(10, 5, 100), Some((5, 9)));
        assert_eq!(bounds(10, 5, 4), None);
        assert_eq!(bounds(10, 10, 12), None);
        assert_eq!(bounds(10, 0, -11), None);
        assert_eq!(bounds(0, 0, -1), None);
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let mut store = MemoryStore::new();
        assert_eq!(store.set("k", "v").await.unwrap(), "OK");
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn set_rejects_empty_key() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.set("", "v").await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn delete_counts_existing_keys_only() {
        let mut store = MemoryStore::new();
        store.set("k", "v").await.unwrap();

        assert_eq!(store.del(&strings(&["k", "missing"])).await.unwrap(), 1);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.del(&strings(&["k"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mget_preserves_order_and_length() {
        let mut store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.set("c", "3").await.unwrap();

        let values = store.mget(&strings(&["a", "b", "c"])).await.unwrap();
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[tokio::test]
    async fn mget_reads_non_string_keys_as_absent() {
        let mut store = MemoryStore::new();
        store.set("a", "1").await.unwrap();
        store.rpush("list", &strings(&["x"])).await.unwrap();
        store.hset("hash", &pairs(&[("f", "v")])).await.unwrap();

        let values = store.mget(&strings(&["a", "list", "hash"])).await.unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, None]);
    }

    #[tokio::test]
    async fn wrong_type_is_reported() {
        let mut store = MemoryStore::new();
        store.rpush("list", &strings(&["a"])).await.unwrap();

        assert!(matches!(store.get("list").await, Err(StoreError::WrongType)));
        assert!(matches!(
            store.hset("list", &pairs(&[("f", "v")])).await,
            Err(StoreError::WrongType)
        ));
    }

    #[tokio::test]
    async fn trim_sequence_works_from_live_state() {
        let mut store = MemoryStore::new();
        let seed: Vec<String> = (1..=10).map(|i| format!("v{}", i)).collect();
        assert_eq!(store.rpush("l", &seed).await.unwrap(), 10);

        store.ltrim("l", 2, -1).await.unwrap();
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            strings(&["v3", "v4", "v5", "v6", "v7", "v8", "v9", "v10"])
        );

        let len = store.llen("l").await.unwrap();
        store.ltrim("l", 0, len - 3).await.unwrap();
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            strings(&["v3", "v4", "v5", "v6", "v7", "v8"])
        );

        store.ltrim("l", 1, 3).await.unwrap();
        assert_eq!(
            store.lrange("l", 0, -1).await.unwrap(),
            strings(&["v4", "v5", "v6"])
        );

        store.ltrim("l", -2, -1).await.unwrap();
        assert_eq!(store.lrange("l", 0, -1).await.unwrap(), strings(&["v5", "v6"]));
    }

    #[tokio::test]
    async fn trim_to_empty_range_removes_list() {
        let mut store = MemoryStore::new();
        store.rpush("l", &strings(&["a", "b"])).await.unwrap();

        store.ltrim("l", 5, 10).await.unwrap();
        assert!(!store.contains_key("l"));
        assert_eq!(store.llen("l").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn hset_counts_only_new_fields() {
        let mut store = MemoryStore::new();
        assert_eq!(store.hset("h", &pairs(&[("name", "John")])).await.unwrap(), 1);
        assert_eq!(
            store
                .hset("h", &pairs(&[("name", "Jane"), ("age", "30")]))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.hget("h", "name").await.unwrap().as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn hdel_shrinks_hash() {
        let mut store = MemoryStore::new();
        store
            .hset("h", &pairs(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();

        assert_eq!(store.hdel("h", &strings(&["a"])).await.unwrap(), 1);
        assert_eq!(store.hlen("h").await.unwrap(), 1);
        assert!(!store.hexists("h", "a").await.unwrap());
        assert!(!store.hgetall("h").await.unwrap().contains_key("a"));

        store.hdel("h", &strings(&["b"])).await.unwrap();
        assert!(!store.contains_key("h"));
    }
}
