//! Redis-backed distributed tier.
//!
//! The connection is established lazily. A store opened while Redis is down reports itself
//! unavailable and retries the connection on every probe, so the tiered cache starts using it
//! as soon as the server answers.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::store::{DistributedStore, StoreInfo};

/// Default timeout of the availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);
/// Default timeout for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
/// Default `COUNT` hint for `SCAN`.
pub const DEFAULT_SCAN_BATCH: usize = 250;

const GLOB_SPECIAL: [char; 5] = ['*', '?', '[', ']', '\\'];

/// [`DistributedStore`] over a multiplexed, auto-reconnecting Redis connection.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    manager: Arc<OnceCell<ConnectionManager>>,
    endpoint: String,
    probe_timeout: Duration,
    connect_timeout: Duration,
    scan_batch: usize,
}

impl RedisStore {
    /// Parses `url` (e.g. `redis://127.0.0.1:6379`) without connecting.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(|e| StoreError::ConnectionFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
            endpoint: url.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            scan_batch: DEFAULT_SCAN_BATCH,
        })
    }

    /// Opens `url` and connects immediately, failing if the server does not answer.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let store = Self::open(url)?;
        store.connection().await?;
        Ok(store)
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_scan_batch(mut self, batch: usize) -> Self {
        self.scan_batch = batch.max(1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns `true` once a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.manager.initialized()
    }

    /// Shared connection, established on first use.
    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let connect = ConnectionManager::new(self.client.clone());
                match tokio::time::timeout(self.connect_timeout, connect).await {
                    Ok(Ok(manager)) => {
                        info!(endpoint = %self.endpoint, "Connected to Redis");
                        Ok(manager)
                    }
                    Ok(Err(e)) => Err(StoreError::ConnectionFailed {
                        url: self.endpoint.clone(),
                        message: e.to_string(),
                    }),
                    Err(_) => Err(StoreError::ConnectionFailed {
                        url: self.endpoint.clone(),
                        message: format!("connect timed out after {:?}", self.connect_timeout),
                    }),
                }
            })
            .await?;
        Ok(manager.clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let probe = async {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            pong
        };

        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StoreError::Unavailable {
                message: e.to_string(),
            }),
            Err(_) => Err(StoreError::Unavailable {
                message: format!("PING timed out after {:?}", self.probe_timeout),
            }),
        }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .field("probe_timeout", &self.probe_timeout)
            .field("scan_batch", &self.scan_batch)
            .finish()
    }
}

fn command_failed(operation: &'static str, key: &str, err: redis::RedisError) -> StoreError {
    StoreError::CommandFailed {
        operation,
        key: key.to_string(),
        message: err.to_string(),
    }
}

/// Translates a prefix pattern (trailing `*`) into a `SCAN MATCH` glob.
///
/// Everything before the wildcard is literal, so glob metacharacters in it are escaped.
fn scan_glob(pattern: &str) -> String {
    let (literal, wildcard) = match pattern.strip_suffix('*') {
        Some(prefix) => (prefix, true),
        None => (pattern, false),
    };

    let mut glob = String::with_capacity(pattern.len() + 4);
    for c in literal.chars() {
        if GLOB_SPECIAL.contains(&c) {
            glob.push('\\');
        }
        glob.push(c);
    }
    if wildcard {
        glob.push('*');
    }
    glob
}

/// TTL in milliseconds, at least 1.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

struct ScanState {
    store: RedisStore,
    conn: Option<ConnectionManager>,
    pattern: String,
    glob: String,
    batch: usize,
    cursor: Option<u64>,
    buffer: VecDeque<String>,
}

impl ScanState {
    fn fail(&mut self, message: String) -> StoreError {
        self.cursor = None;
        self.buffer.clear();
        StoreError::ScanFailed {
            pattern: self.pattern.clone(),
            message,
        }
    }
}

impl DistributedStore for RedisStore {
    async fn is_available(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Redis probe failed");
                false
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| command_failed("GET", key, e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .pset_ex(key, value, ttl_millis(ttl))
            .await
            .map_err(|e| command_failed("PSETEX", key, e))?;
        Ok(())
    }

    fn scan_keys(&self, pattern: &str) -> BoxStream<'static, StoreResult<String>> {
        let state = ScanState {
            store: self.clone(),
            conn: None,
            pattern: pattern.to_string(),
            glob: scan_glob(pattern),
            batch: self.scan_batch,
            cursor: Some(0),
            buffer: VecDeque::new(),
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(key) = state.buffer.pop_front() {
                    return Some((Ok(key), state));
                }
                let cursor = state.cursor?;

                let mut conn = match state.conn.clone() {
                    Some(conn) => conn,
                    None => match state.store.connection().await {
                        Ok(conn) => {
                            state.conn = Some(conn.clone());
                            conn
                        }
                        Err(e) => {
                            let err = state.fail(e.to_string());
                            return Some((Err(err), state));
                        }
                    },
                };

                let page: redis::RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&state.glob)
                    .arg("COUNT")
                    .arg(state.batch)
                    .query_async(&mut conn)
                    .await;

                match page {
                    Ok((next, keys)) => {
                        state.cursor = if next == 0 { None } else { Some(next) };
                        state.buffer.extend(keys);
                    }
                    Err(e) => {
                        let err = state.fail(e.to_string());
                        return Some((Err(err), state));
                    }
                }
            }
        })
        .boxed()
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn
            .del(key)
            .await
            .map_err(|e| command_failed("DEL", key, e))?;
        Ok(removed > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed: u64 = conn
            .del(keys.to_vec())
            .await
            .map_err(|e| command_failed("DEL", &keys[0], e))?;
        Ok(removed)
    }

    async fn server_info(&self) -> StoreResult<StoreInfo> {
        let mut conn = self.connection().await?;
        let raw: String = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable {
                message: e.to_string(),
            })?;

        Ok(parse_info(&self.endpoint, &raw))
    }
}

fn parse_info(endpoint: &str, raw: &str) -> StoreInfo {
    let mut version = None;
    let mut replica = false;

    for line in raw.lines() {
        if let Some(v) = line.strip_prefix("redis_version:") {
            version = Some(v.trim().to_string());
        } else if let Some(role) = line.strip_prefix("role:") {
            replica = matches!(role.trim(), "slave" | "replica");
        }
    }

    StoreInfo {
        endpoint: endpoint.to_string(),
        version,
        replica,
    }
}
