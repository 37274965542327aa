pub mod memory;
pub mod redis;

use std::collections::BTreeMap;

use log::debug;

use crate::config::Config;
use crate::error::StoreError;

pub use self::memory::{MemoryConnector, MemoryStore};
pub use self::redis::{RedisConnector, RedisStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// The commands the runner can issue against a key-value store.
///
/// List indices follow the usual convention: negative values count from the
/// end, `-1` being the last element, and ranges include `stop`.
#[allow(async_fn_in_trait)]
pub trait Store: Sized {
    async fn ping(&mut self) -> StoreResult<String>;

    async fn set(&mut self, key: &str, value: &str) -> StoreResult<String>;

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// One entry per requested key, in request order.
    async fn mget(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Returns how many of `keys` existed.
    async fn del(&mut self, keys: &[String]) -> StoreResult<i64>;

    /// Appends `values` in order and returns the new length.
    async fn rpush(&mut self, key: &str, values: &[String]) -> StoreResult<i64>;

    async fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    async fn llen(&mut self, key: &str) -> StoreResult<i64>;

    async fn ltrim(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<String>;

    /// Returns the number of fields that did not exist before. Updated fields
    /// are not counted.
    async fn hset(&mut self, key: &str, fields: &[(String, String)]) -> StoreResult<i64>;

    async fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>>;

    async fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>>;

    async fn hexists(&mut self, key: &str, field: &str) -> StoreResult<bool>;

    async fn hlen(&mut self, key: &str) -> StoreResult<i64>;

    async fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<i64>;

    /// Releases the underlying connection.
    fn close(self) {}
}

/// Opens a [`Store`] for a given configuration.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Store: Store;

    async fn connect(&self, config: &Config) -> StoreResult<Self::Store>;
}

/// Owns a live store for the length of a run and releases it exactly once,
/// either through [`Session::close`] or on drop.
pub struct Session<S: Store> {
    store: Option<S>,
}

impl<S: Store> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store: Some(store) }
    }

    /// Access to the open store. Fails with [`StoreError::Closed`] once the
    /// session has been closed.
    pub fn store(&mut self) -> StoreResult<&mut S> {
        self.store.as_mut().ok_or(StoreError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_none()
    }

    pub fn close(&mut self) {
        if let Some(store) = self.store.take() {
            debug!("Releasing store connection");
            store.close();
        }
    }
}

impl<S: Store> Drop for Session<S> {
    fn drop(&mut self) {
        self.close();
    }
}
