use crate::store::ChainStore;
use crate::{DescriptorFactory, ProcessDescriptor};
use chaincore::{Chain, ChainError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered chain that could not be turned into a callable process,
/// kept visible so operators can diagnose misconfigured registrations
/// instead of watching processes silently vanish
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableProcess {
    pub id: String,
    pub reason: String,
}

/// Everything the registry currently derives from the chain store
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessInventory {
    pub available: Vec<ProcessDescriptor>,
    pub unavailable: Vec<UnavailableProcess>,
}

/// Answers "what processes exist" and resolves identifiers to callable
/// descriptors, without callers knowing whether an entry is backend-driven
/// or a statically registered chain type
pub struct ProcessRegistry {
    store: Arc<dyn ChainStore>,
    factory: DescriptorFactory,
    /// Precompiled chain-type processes; unaffected by [`clear_all`]
    builtin: Vec<(ProcessDescriptor, Chain)>,
}

impl ProcessRegistry {
    pub fn new(store: Arc<dyn ChainStore>, factory: DescriptorFactory) -> Self {
        Self {
            store,
            factory,
            builtin: Vec::new(),
        }
    }

    /// Add a statically registered chain-type process
    pub fn with_builtin(mut self, descriptor: ProcessDescriptor, chain: Chain) -> Self {
        self.builtin.push((descriptor, chain));
        self
    }

    /// Materialize the current process set. Rebuilt from the chain store on
    /// every call, so store mutations are immediately visible at the cost
    /// of recomputation per query. Duplicate derived identifiers resolve
    /// last-registered-wins.
    pub async fn inventory(&self) -> Result<ProcessInventory, ChainError> {
        let chains = self.store.list().await?;

        let mut order: Vec<String> = Vec::new();
        let mut available: HashMap<String, ProcessDescriptor> = HashMap::new();
        let mut unavailable: Vec<UnavailableProcess> = Vec::new();

        for (descriptor, _) in &self.builtin {
            if !available.contains_key(&descriptor.id) {
                order.push(descriptor.id.clone());
            }
            available.insert(descriptor.id.clone(), descriptor.clone());
        }

        for chain in &chains {
            match self.derive(chain) {
                Ok(descriptor) => {
                    if !available.contains_key(&descriptor.id) {
                        order.push(descriptor.id.clone());
                    }
                    available.insert(descriptor.id.clone(), descriptor);
                }
                Err(err) => {
                    tracing::warn!("chain {} is not callable: {}", chain.id, err);
                    unavailable.push(UnavailableProcess {
                        id: display_id(chain),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let available = order
            .into_iter()
            .filter_map(|id| available.remove(&id))
            .collect();

        Ok(ProcessInventory {
            available,
            unavailable,
        })
    }

    /// The currently callable descriptors only
    pub async fn list(&self) -> Result<Vec<ProcessDescriptor>, ChainError> {
        Ok(self.inventory().await?.available)
    }

    /// Resolve an identifier to its descriptor. Absent and non-callable
    /// entries both resolve to `UnknownProcess`; the reason for a
    /// non-callable entry remains inspectable via [`inventory`].
    pub async fn get(&self, id: &str) -> Result<ProcessDescriptor, ChainError> {
        self.list()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ChainError::UnknownProcess(id.to_string()))
    }

    /// The backing chain for execution; last registered wins, builtin
    /// chain types are consulted after store-backed entries.
    pub async fn get_chain(&self, id: &str) -> Result<Chain, ChainError> {
        let chains = self.store.list().await?;
        let mut found = None;
        for chain in chains {
            if let Ok(descriptor) = self.derive(&chain) {
                if descriptor.id == id {
                    found = Some(chain);
                }
            }
        }
        if found.is_none() {
            found = self
                .builtin
                .iter()
                .find(|(d, _)| d.id == id)
                .map(|(_, c)| c.clone());
        }
        found.ok_or_else(|| ChainError::UnknownProcess(id.to_string()))
    }

    /// Remove every chain-backed process from the store. Builtin
    /// chain-type processes are untouched.
    pub async fn clear_all(&self) -> Result<(), ChainError> {
        tracing::info!("clearing all chain-backed processes");
        self.store.clear().await
    }

    fn derive(&self, chain: &Chain) -> Result<ProcessDescriptor, ChainError> {
        let report = chain.validate();
        if !report.is_valid() {
            return Err(ChainError::Invalid(report.to_string()));
        }
        self.factory.describe(chain)
    }
}

/// Identifier shown for a chain that never produced a descriptor
fn display_id(chain: &Chain) -> String {
    chain
        .resolve_execution_element()
        .ok()
        .and_then(|e| e.backend_code())
        .map(str::to_string)
        .unwrap_or_else(|| chain.id.to_string())
}
