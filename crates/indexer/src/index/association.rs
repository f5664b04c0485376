//! Association graph.
//!
//! Edges are directed (parent = sender, child = party) and stored twice: in
//! the parent's children set and in the child's parents set. Both sets are
//! always written together.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use lto_index_core::{Transaction, TX_ASSOCIATION, TX_REVOKE_ASSOCIATION};

use crate::error::Result;
use crate::storage::{keys, Storage};

/// Both directions of an address's associations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Associations {
    /// Addresses this address associated.
    pub children: Vec<String>,
    /// Addresses that associated this address.
    pub parents: Vec<String>,
}

/// Maintains the mirrored adjacency sets.
#[derive(Clone)]
pub struct AssociationGraph {
    storage: Arc<dyn Storage>,
}

impl AssociationGraph {
    /// Create a new association graph.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Apply an association or revocation. Returns the number of edges touched.
    pub async fn index(&self, tx: &Transaction) -> Result<usize> {
        let (Some(sender), Some(party)) = (tx.sender_address(), tx.association_party()) else {
            warn!("Association {} has no sender or party, skipping", tx.id);
            return Ok(0);
        };

        match tx.tx_type {
            TX_ASSOCIATION => {
                self.add_association(sender, party).await?;
                Ok(1)
            }
            TX_REVOKE_ASSOCIATION => self.remove_association(sender, party).await,
            _ => Ok(0),
        }
    }

    /// Record the edge `parent -> child`.
    pub async fn add_association(&self, parent: &str, child: &str) -> Result<()> {
        self.storage
            .sadd(&keys::association_children(parent), child)
            .await?;
        self.storage
            .sadd(&keys::association_parents(child), parent)
            .await?;

        debug!("Association {} -> {}", parent, child);
        Ok(())
    }

    /// Remove `parent -> child` and every edge below `child`.
    ///
    /// Returns the number of edges removed, the initial one included. Each
    /// edge is deleted before its target is visited, so a cycle is walked at
    /// most once.
    pub async fn remove_association(&self, parent: &str, child: &str) -> Result<usize> {
        self.remove_edge(parent, child).await?;
        let mut removed = 1;

        let mut pending = vec![child.to_string()];
        while let Some(node) = pending.pop() {
            let children = self
                .storage
                .get_array(&keys::association_children(&node))
                .await?;

            for grandchild in children {
                self.remove_edge(&node, &grandchild).await?;
                removed += 1;
                pending.push(grandchild);
            }
        }

        debug!(
            "Association {} -> {} removed ({} edges)",
            parent, child, removed
        );
        Ok(removed)
    }

    async fn remove_edge(&self, parent: &str, child: &str) -> Result<()> {
        self.storage
            .srem(&keys::association_children(parent), child)
            .await?;
        self.storage
            .srem(&keys::association_parents(child), parent)
            .await
    }

    /// Addresses associated by `address`.
    pub async fn get_children(&self, address: &str) -> Result<Vec<String>> {
        self.storage
            .get_array(&keys::association_children(address))
            .await
    }

    /// Addresses that associated `address`.
    pub async fn get_parents(&self, address: &str) -> Result<Vec<String>> {
        self.storage
            .get_array(&keys::association_parents(address))
            .await
    }

    /// Both directions at once.
    pub async fn get_associations(&self, address: &str) -> Result<Associations> {
        Ok(Associations {
            children: self.get_children(address).await?,
            parents: self.get_parents(address).await?,
        })
    }
}
