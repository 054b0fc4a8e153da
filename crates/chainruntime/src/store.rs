use async_trait::async_trait;
use chaincore::{Chain, ChainError, ChainId};
use tokio::sync::RwLock;

/// Boundary to wherever chain definitions live. The engine treats entries
/// opaquely and defines no persistence format; implementations handle
/// their own concurrency.
#[async_trait]
pub trait ChainStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Chain>, ChainError>;

    async fn create(&self, chain: Chain) -> Result<(), ChainError>;

    /// Delete one chain of the given backend kind; returns whether an
    /// entry was removed.
    async fn delete(&self, kind: &str, id: ChainId) -> Result<bool, ChainError>;

    /// Remove every stored chain.
    async fn clear(&self) -> Result<(), ChainError>;
}

/// In-memory chain store preserving registration order
pub struct MemoryChainStore {
    chains: RwLock<Vec<Chain>>,
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self {
            chains: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn list(&self) -> Result<Vec<Chain>, ChainError> {
        Ok(self.chains.read().await.clone())
    }

    async fn create(&self, chain: Chain) -> Result<(), ChainError> {
        self.chains.write().await.push(chain);
        Ok(())
    }

    async fn delete(&self, kind: &str, id: ChainId) -> Result<bool, ChainError> {
        let mut chains = self.chains.write().await;
        let before = chains.len();
        chains.retain(|c| {
            let same_kind = c
                .resolve_execution_element()
                .ok()
                .and_then(|e| e.backend_code())
                .is_some_and(|code| code.starts_with(kind));
            !(c.id == id && same_kind)
        });
        Ok(chains.len() != before)
    }

    async fn clear(&self) -> Result<(), ChainError> {
        self.chains.write().await.clear();
        Ok(())
    }
}
