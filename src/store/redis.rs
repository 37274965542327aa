use std::collections::BTreeMap;

use log::{debug, info};
use redis::aio::{self, ConnectionLike};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{AsyncCommands, Client, Cmd, Pipeline, RedisError, RedisFuture, Value};
use tokio::time;

use super::{Connector, Store, StoreResult};
use crate::config::{Config, Mode};
use crate::error::StoreError;

/// Either a single-node connection or a cluster connection. Both speak the
/// same command set, so everything above this goes through `AsyncCommands`.
enum Connection {
    Standalone(aio::Connection),
    Cluster(ClusterConnection),
}

impl ConnectionLike for Connection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match self {
            Connection::Standalone(conn) => conn.req_packed_command(cmd),
            Connection::Cluster(conn) => conn.req_packed_command(cmd),
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match self {
            Connection::Standalone(conn) => conn.req_packed_commands(cmd, offset, count),
            Connection::Cluster(conn) => conn.req_packed_commands(cmd, offset, count),
        }
    }

    fn get_db(&self) -> i64 {
        match self {
            Connection::Standalone(conn) => conn.get_db(),
            Connection::Cluster(conn) => conn.get_db(),
        }
    }
}

/// Opens connections with the `redis` crate, standalone or cluster depending
/// on [`Config::mode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RedisConnector;

impl Connector for RedisConnector {
    type Store = RedisStore;

    async fn connect(&self, config: &Config) -> StoreResult<RedisStore> {
        let url = config.url();
        info!("Connecting to {}", config);

        let pending = async {
            let conn = match config.mode() {
                Mode::Cluster => {
                    let client = ClusterClient::new(vec![url])?;
                    Connection::Cluster(client.get_async_connection().await?)
                }
                Mode::Standalone => {
                    let client = Client::open(url)?;
                    Connection::Standalone(client.get_async_connection().await?)
                }
            };
            Ok::<_, RedisError>(conn)
        };

        let conn = time::timeout(config.connect_timeout(), pending)
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout()))??;

        info!("Connected to {}", config.host());
        Ok(RedisStore { conn })
    }
}

/// A live connection to a Redis-protocol server.
pub struct RedisStore {
    conn: Connection,
}

impl RedisStore {
    fn is_cluster(&self) -> bool {
        matches!(self.conn, Connection::Cluster(_))
    }
}

fn index(value: i64) -> StoreResult<isize> {
    isize::try_from(value)
        .map_err(|_| StoreError::InvalidArgument(format!("list index {} out of range", value)))
}

impl Store for RedisStore {
    async fn ping(&mut self) -> StoreResult<String> {
        let reply: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(reply)
    }

    async fn set(&mut self, key: &str, value: &str) -> StoreResult<String> {
        let reply: String = self.conn.set(key, value).await?;
        Ok(reply)
    }

    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn.get(key).await?;
        Ok(value)
    }

    async fn mget(&mut self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        // A multi-key MGET across slots is rejected with CROSSSLOT. One MGET per
        // key stays slot-local and, unlike GET, reads non-string keys as nil.
        if self.is_cluster() {
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                let mut value: Vec<Option<String>> = redis::cmd("MGET")
                    .arg(key)
                    .query_async(&mut self.conn)
                    .await?;
                values.push(value.pop().flatten());
            }
            return Ok(values);
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut self.conn)
            .await?;
        Ok(values)
    }

    async fn del(&mut self, keys: &[String]) -> StoreResult<i64> {
        if self.is_cluster() {
            let mut removed = 0;
            for key in keys {
                let count: i64 = self.conn.del(key).await?;
                removed += count;
            }
            return Ok(removed);
        }

        let removed: i64 = self.conn.del(keys).await?;
        Ok(removed)
    }

    async fn rpush(&mut self, key: &str, values: &[String]) -> StoreResult<i64> {
        let len: i64 = self.conn.rpush(key, values).await?;
        Ok(len)
    }

    async fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let values: Vec<String> = self.conn.lrange(key, index(start)?, index(stop)?).await?;
        Ok(values)
    }

    async fn llen(&mut self, key: &str) -> StoreResult<i64> {
        let len: i64 = self.conn.llen(key).await?;
        Ok(len)
    }

    async fn ltrim(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<String> {
        let reply: String = self.conn.ltrim(key, index(start)?, index(stop)?).await?;
        Ok(reply)
    }

    async fn hset(&mut self, key: &str, fields: &[(String, String)]) -> StoreResult<i64> {
        // Variadic HSET replies with the number of new fields; HMSET only says OK.
        let created: i64 = redis::cmd("HSET")
            .arg(key)
            .arg(fields)
            .query_async(&mut self.conn)
            .await?;
        Ok(created)
    }

    async fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, String>> {
        let fields: BTreeMap<String, String> = self.conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hexists(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        let exists: bool = self.conn.hexists(key, field).await?;
        Ok(exists)
    }

    async fn hlen(&mut self, key: &str) -> StoreResult<i64> {
        let len: i64 = self.conn.hlen(key).await?;
        Ok(len)
    }

    async fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<i64> {
        let removed: i64 = self.conn.hdel(key, fields).await?;
        Ok(removed)
    }

    fn close(self) {
        debug!("Closing connection");
        drop(self.conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_accepts_negative_offsets() {
        assert_eq!(index(-1).unwrap(), -1);
        assert_eq!(index(3).unwrap(), 3);
    }

    #[tokio::test]
    async fn connect_to_unreachable_endpoint_fails() {
        // Port 1 on loopback is not expected to host a server.
        let config = Config::new("127.0.0.1", 1, false)
            .unwrap()
            .with_mode(Mode::Standalone)
            .with_connect_timeout(std::time::Duration::from_secs(2))
            .unwrap();

        let result = RedisConnector.connect(&config).await;
        assert!(result.is_err());
    }
}
