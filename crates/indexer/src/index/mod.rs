//! Derived indexes and the transaction dispatcher.
//!
//! [`IndexService::index`] is called once per transaction, in block order:
//!
//! 1. Generic indexing for every type: ranked history, public key, daily stats.
//! 2. Types outside `indexing.relevant_types` stop here.
//! 3. Anchors (12, 15), then associations (16, 17) which feed the graph, the
//!    verification methods and the trust network.
//!
//! Each step can be switched off through [`IndexingConfig`].

use std::sync::Arc;
use tracing::debug;

use lto_index_core::{Transaction, TX_ANCHOR, TX_ASSOCIATION, TX_DATA, TX_REVOKE_ASSOCIATION};

use crate::config::{IndexingConfig, TrustNetworkConfig};
use crate::error::Result;
use crate::storage::Storage;

pub mod anchor;
pub mod association;
pub mod identity;
pub mod stats;
pub mod transactions;
pub mod trust;

pub use anchor::AnchorIndex;
pub use association::{AssociationGraph, Associations};
pub use identity::{IdentityIndex, VerificationMethod, VerificationMethodEntry};
pub use stats::{DailyCount, StatsIndex};
pub use transactions::TransactionIndex;
pub use trust::{ResolvedRoles, RoleAssignment, TrustNetwork};

/// Routes transactions to the derived indexes.
#[derive(Clone)]
pub struct IndexService {
    config: IndexingConfig,
    transactions: TransactionIndex,
    stats: StatsIndex,
    anchors: AnchorIndex,
    identity: IdentityIndex,
    associations: AssociationGraph,
    trust: TrustNetwork,
}

impl IndexService {
    /// Build every index over one storage backend.
    pub fn new(
        storage: Arc<dyn Storage>,
        config: IndexingConfig,
        trust_network: &TrustNetworkConfig,
    ) -> Self {
        Self {
            config,
            transactions: TransactionIndex::new(storage.clone()),
            stats: StatsIndex::new(storage.clone()),
            anchors: AnchorIndex::new(storage.clone()),
            identity: IdentityIndex::new(storage.clone()),
            associations: AssociationGraph::new(storage.clone()),
            trust: TrustNetwork::new(storage, trust_network),
        }
    }

    /// Index a single transaction.
    pub async fn index(&self, tx: &Transaction) -> Result<()> {
        debug!("Indexing tx {} (type {})", tx.id, tx.tx_type);

        if self.config.transactions {
            self.transactions.index(tx).await?;
        }
        if self.config.identities {
            self.identity.save_public_key(tx).await?;
        }
        if self.config.statistics {
            self.stats.increment(tx).await?;
        }

        if !self.config.relevant_types.contains(&tx.tx_type) {
            return Ok(());
        }

        match tx.tx_type {
            TX_DATA | TX_ANCHOR if self.config.anchors => {
                self.anchors.index(tx).await?;
            }
            TX_ASSOCIATION | TX_REVOKE_ASSOCIATION => self.index_association(tx).await?,
            _ => {}
        }

        Ok(())
    }

    async fn index_association(&self, tx: &Transaction) -> Result<()> {
        if self.config.associations {
            self.associations.index(tx).await?;
        }
        if self.config.identities {
            self.identity.index(tx).await?;
        }
        if self.config.trust_network {
            self.trust.index(tx).await?;
        }
        Ok(())
    }

    /// Ranked transaction history.
    pub fn transactions(&self) -> &TransactionIndex {
        &self.transactions
    }

    /// Daily transaction counters.
    pub fn stats(&self) -> &StatsIndex {
        &self.stats
    }

    /// Anchor hashes.
    pub fn anchors(&self) -> &AnchorIndex {
        &self.anchors
    }

    /// Public keys and verification methods.
    pub fn identity(&self) -> &IdentityIndex {
        &self.identity
    }

    /// Association graph.
    pub fn associations(&self) -> &AssociationGraph {
        &self.associations
    }

    /// Trust network roles.
    pub fn trust(&self) -> &TrustNetwork {
        &self.trust
    }
}
