//! Reusable HTTP client handles with an explicit acquire/release lifecycle.
//!
//! Each playback session acquires one handle at session start and holds it
//! until the stream closes; dropping the handle returns the client to the
//! pool. The pool is an ordinary object passed into session constructors,
//! with no hidden process-wide state.

use std::{
    ops::Deref,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{config::Config, error::Result, http::Client};

/// Pool of idle HTTP clients, keyed by nothing: any idle handle serves
/// any session.
pub struct ClientPool {
    /// Configuration used to build new clients when the pool is empty.
    config: Config,

    /// Idle clients awaiting reuse.
    idle: Arc<Mutex<Vec<Client>>>,
}

impl ClientPool {
    /// Creates an empty pool; clients are built lazily on first acquire.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Acquires a client handle, reusing an idle one when available.
    ///
    /// The returned guard gives the client back to the pool when dropped,
    /// on every exit path including decode failure.
    ///
    /// # Errors
    ///
    /// Returns error if a new client needs to be built and creation fails.
    pub fn acquire(&self) -> Result<PooledClient> {
        let idle = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let client = match idle {
            Some(client) => client,
            None => {
                trace!("pool empty, building a new HTTP client");
                Client::new(&self.config)?
            }
        };

        Ok(PooledClient {
            client: Some(client),
            idle: Arc::clone(&self.idle),
        })
    }

    /// Number of idle clients currently held.
    #[must_use]
    pub fn idle_len(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Scoped client handle; returns the client to the pool on drop.
pub struct PooledClient {
    /// `None` only after drop has taken the client back.
    client: Option<Client>,

    /// Shared idle list of the owning pool.
    idle: Arc<Mutex<Vec<Client>>>,
}

impl Deref for PooledClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref().expect("client already released")
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(client);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{key::Key, protocol::Format};

    fn pool() -> ClientPool {
        let config = Config::new(
            Key::default(),
            Format::Mp3,
            "https://resolve.example.com/getMediaURL".parse().unwrap(),
        );
        ClientPool::new(&config)
    }

    #[test]
    fn released_clients_are_reused() {
        let pool = pool();
        assert_eq!(pool.idle_len(), 0);

        let handle = pool.acquire().unwrap();
        assert_eq!(pool.idle_len(), 0);

        drop(handle);
        assert_eq!(pool.idle_len(), 1);

        let _handle = pool.acquire().unwrap();
        assert_eq!(pool.idle_len(), 0);
    }

    #[test]
    fn concurrent_sessions_get_distinct_handles() {
        let pool = pool();
        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();

        drop(first);
        drop(second);
        assert_eq!(pool.idle_len(), 2);
    }
}
