//! Client abstraction the dispatcher fans calls out to

use crate::error::CallError;
use crate::request::ApiRequest;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One independently usable connection to the API server.
///
/// Implementations must be safe to call from many in-flight calls at once:
/// the pool is normally much smaller than the number of concurrent calls.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform one request, giving up after `timeout`.
    async fn execute(&self, request: &ApiRequest, timeout: Duration) -> Result<(), CallError>;
}

/// Fixed, ordered set of clients selected round-robin by admission sequence.
#[derive(Clone)]
pub struct ClientPool {
    clients: Arc<[Arc<dyn ApiClient>]>,
}

impl ClientPool {
    /// Returns `None` for an empty set; a run needs at least one client.
    pub fn new(clients: Vec<Arc<dyn ApiClient>>) -> Option<Self> {
        if clients.is_empty() {
            return None;
        }
        Some(Self {
            clients: clients.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Client index serving the call with admission number `sequence`.
    pub fn index_for(&self, sequence: u64) -> usize {
        (sequence % self.clients.len() as u64) as usize
    }

    pub fn get(&self, index: usize) -> Arc<dyn ApiClient> {
        Arc::clone(&self.clients[index])
    }
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("size", &self.clients.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopClient;

    #[async_trait]
    impl ApiClient for NoopClient {
        async fn execute(&self, _: &ApiRequest, _: Duration) -> Result<(), CallError> {
            Ok(())
        }
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(ClientPool::new(Vec::new()).is_none());
    }

    #[test]
    fn test_round_robin_index() {
        let clients: Vec<Arc<dyn ApiClient>> = (0..3).map(|_| Arc::new(NoopClient) as _).collect();
        let pool = ClientPool::new(clients).unwrap();
        let picked: Vec<usize> = (0..7).map(|seq| pool.index_for(seq)).collect();
        assert_eq!(picked, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(pool.len(), 3);
    }
}
