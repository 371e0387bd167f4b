//! Redis cache sink.
//!
//! Uses one synchronous connection for the whole run: `PING` when
//! connecting, `SET` per entry and `FLUSHDB` for clearing. Every command is
//! a round-trip; nothing is pipelined.

use std::time::Duration;

use redis::{Commands, Connection};

use super::{CacheEntry, CacheError, CacheKey, CacheResult, CacheWriter};
use crate::config::RedisConfig;

/// Connection URL for `config`, selecting its logical database.
#[must_use]
pub fn connection_url(config: &RedisConfig) -> String {
    let host = if config.host.contains(':') {
        format!("[{}]", config.host)
    } else {
        config.host.clone()
    };
    format!("redis://{}:{}/{}", host, config.port, config.db)
}

/// Cache sink writing to a Redis server.
pub struct RedisCache {
    conn: Connection,
    url: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("url", &self.url).finish()
    }
}

impl RedisCache {
    /// Connect, select the configured database and check the server answers `PING`.
    pub fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let url = connection_url(config);
        let timeout = Duration::from_millis(config.timeout_ms);
        let connect_err = |source| CacheError::Connect {
            addr: url.clone(),
            source,
        };

        let client = redis::Client::open(url.as_str()).map_err(connect_err)?;
        let mut conn = client
            .get_connection_with_timeout(timeout)
            .map_err(connect_err)?;
        conn.set_read_timeout(Some(timeout))?;
        conn.set_write_timeout(Some(timeout))?;

        let pong: String = redis::cmd("PING").query(&mut conn)?;
        if pong != "PONG" {
            return Err(CacheError::Protocol(format!("PING answered {pong:?}")));
        }

        log::debug!("Connected to cache at {url}");
        Ok(Self { conn, url })
    }
}

impl CacheWriter for RedisCache {
    fn upsert(&mut self, key: &CacheKey, entry: &CacheEntry) -> CacheResult<()> {
        self.conn.set::<_, _, ()>(key.as_str(), entry.as_bytes())?;
        Ok(())
    }

    fn clear(&mut self) -> CacheResult<()> {
        redis::cmd("FLUSHDB").query::<()>(&mut self.conn)?;
        Ok(())
    }
}
