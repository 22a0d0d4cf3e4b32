//! Minimal memcached client
//!
//! Speaks just enough of the text protocol to store values:
//!
//! ```text
//! set <key> 0 0 <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! answered by `STORED\r\n` on success. Idle connections are pooled and
//! reused; a connection that saw any error is dropped so the next attempt
//! starts on a fresh socket.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use super::{KeyValueStore, StoreError};
use crate::models::{RoutingKey, SerializedPayload};

/// memcached refuses longer keys
pub const MAX_KEY_LENGTH: usize = 250;

/// Idle connections kept per store
const MAX_IDLE_CONNECTIONS: usize = 8;

type Connection = BufStream<TcpStream>;

pub struct MemcacheStore {
    address: String,
    timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl MemcacheStore {
    /// Create a client; no connection is made until the first write
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Take an idle connection, or open one; the flag is true for pooled ones
    async fn checkout(&self) -> Result<(Connection, bool), StoreError> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok((conn, true));
        }
        Ok((self.connect().await?, false))
    }

    async fn connect(&self) -> Result<Connection, StoreError> {
        debug!(address = %self.address, "Opening memcached connection");
        match timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(stream)) => Ok(BufStream::new(stream)),
            Ok(Err(source)) => Err(StoreError::Connect {
                address: self.address.clone(),
                source,
            }),
            Err(_) => Err(self.timeout_error()),
        }
    }

    /// Run one `set` on `conn`, returning it to the pool on success
    async fn send(
        &self,
        mut conn: Connection,
        key: &RoutingKey,
        value: &SerializedPayload,
    ) -> Result<(), StoreError> {
        match timeout(self.timeout, write_set(&mut conn, key, value)).await {
            Ok(Ok(())) => {
                self.checkin(conn).await;
                Ok(())
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(self.timeout_error()),
        }
    }

    async fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().await;
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
    }

    fn timeout_error(&self) -> StoreError {
        StoreError::Timeout {
            address: self.address.clone(),
            secs: self.timeout.as_secs(),
        }
    }
}

/// Errors a pooled socket closed by the server shows on its next use
fn is_stale(error: &StoreError) -> bool {
    matches!(error, StoreError::ConnectionClosed | StoreError::Io(_))
}

fn validate_key(key: &RoutingKey) -> Result<(), StoreError> {
    let raw = key.as_str();
    if raw.is_empty()
        || raw.len() > MAX_KEY_LENGTH
        || raw.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
    {
        return Err(StoreError::InvalidKey(raw.to_string()));
    }
    Ok(())
}

async fn write_set(
    conn: &mut Connection,
    key: &RoutingKey,
    value: &SerializedPayload,
) -> Result<(), StoreError> {
    let header = format!("set {} 0 0 {}\r\n", key, value.len());
    conn.write_all(header.as_bytes()).await?;
    conn.write_all(value.as_bytes()).await?;
    conn.write_all(b"\r\n").await?;
    conn.flush().await?;

    let mut reply = String::new();
    if conn.read_line(&mut reply).await? == 0 {
        return Err(StoreError::ConnectionClosed);
    }

    match reply.trim_end() {
        "STORED" => Ok(()),
        other => Err(StoreError::Rejected(other.to_string())),
    }
}

#[async_trait]
impl KeyValueStore for MemcacheStore {
    fn address(&self) -> &str {
        &self.address
    }

    async fn set(&self, key: &RoutingKey, value: &SerializedPayload) -> Result<(), StoreError> {
        validate_key(key)?;

        let (conn, pooled) = self.checkout().await?;
        match self.send(conn, key, value).await {
            // the server dropped idle sockets; the rest of the pool is stale too
            Err(e) if pooled && is_stale(&e) => {
                debug!(address = %self.address, error = %e, "Pooled connection is stale, reconnecting");
                self.idle.lock().await.clear();
                let conn = self.connect().await?;
                self.send(conn, key, value).await
            },
            result => result,
        }
    }
}
