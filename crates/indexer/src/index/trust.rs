//! Trust network roles.
//!
//! Each address has a role document `{ "<role>": { "sender": .., "type": .. } }`.
//! What a role lets its holder issue comes from the configured role table.
//! Roles missing from the table are ignored when resolving.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use lto_index_core::{Transaction, TX_ASSOCIATION, TX_REVOKE_ASSOCIATION};

use crate::config::{RoleDefinition, RoleIssue, TrustNetworkConfig};
use crate::error::Result;
use crate::storage::{keys, Storage};

/// Role implicitly held by the configured root address.
pub const ROOT_ROLE: &str = "root";

/// A stored role grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Address that granted the role.
    pub sender: String,
    /// Association type the grant was made with.
    #[serde(rename = "type")]
    pub association_type: u64,
}

/// Roles of an address and what they allow it to issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedRoles {
    /// Known roles held.
    pub roles: Vec<String>,
    /// Roles the holder may issue, first definition wins per role name.
    pub issues_roles: Vec<RoleIssue>,
    /// Authorization scopes the holder may issue.
    pub issues_authorization: Vec<String>,
}

/// Resolves and indexes trust network roles.
#[derive(Clone)]
pub struct TrustNetwork {
    storage: Arc<dyn Storage>,
    roles: BTreeMap<String, RoleDefinition>,
    root_address: Option<String>,
}

impl TrustNetwork {
    /// Create a resolver over the configured role table.
    pub fn new(storage: Arc<dyn Storage>, config: &TrustNetworkConfig) -> Self {
        Self {
            storage,
            roles: config.roles.clone(),
            root_address: config.root_address.clone(),
        }
    }

    /// Grant or revoke the roles the sender issues through this association type.
    ///
    /// Returns the number of roles changed on the party.
    pub async fn index(&self, tx: &Transaction) -> Result<usize> {
        let (Some(sender), Some(party), Some(association_type)) =
            (tx.sender_address(), tx.association_party(), tx.association_type)
        else {
            return Ok(0);
        };

        let issuer = self.get_roles(sender).await?;
        let mut changed = 0;

        for issue in issuer
            .issues_roles
            .iter()
            .filter(|issue| issue.association_type == association_type)
        {
            match tx.tx_type {
                TX_ASSOCIATION => {
                    self.save_role(party, sender, issue).await?;
                    changed += 1;
                }
                TX_REVOKE_ASSOCIATION => {
                    if self.remove_role(party, sender, &issue.role).await? {
                        changed += 1;
                    }
                }
                _ => {}
            }
        }

        Ok(changed)
    }

    /// Resolve the roles of `address` against the role table.
    pub async fn get_roles(&self, address: &str) -> Result<ResolvedRoles> {
        let doc = self.storage.get_object(&keys::roles(address)).await?;

        let mut assigned: Vec<&str> = Vec::new();
        if self.root_address.as_deref() == Some(address) {
            assigned.push(ROOT_ROLE);
        }
        assigned.extend(doc.keys().map(String::as_str));

        let mut resolved = ResolvedRoles::default();
        let mut issued_names = HashSet::new();

        for name in assigned {
            let Some(definition) = self.roles.get(name) else {
                continue;
            };
            if resolved.roles.iter().any(|r| r == name) {
                continue;
            }
            resolved.roles.push(name.to_string());

            for issue in &definition.issues {
                if issued_names.insert(issue.role.clone()) {
                    resolved.issues_roles.push(issue.clone());
                }
            }
            for scope in &definition.authorization {
                if !resolved.issues_authorization.contains(scope) {
                    resolved.issues_authorization.push(scope.clone());
                }
            }
        }

        Ok(resolved)
    }

    /// Record that `grantor` gave `recipient` the role in `issue`.
    pub async fn save_role(&self, recipient: &str, grantor: &str, issue: &RoleIssue) -> Result<()> {
        let key = keys::roles(recipient);
        let mut doc = self.storage.get_object(&key).await?;

        let assignment = RoleAssignment {
            sender: grantor.to_string(),
            association_type: issue.association_type,
        };
        doc.insert(issue.role.clone(), serde_json::to_value(&assignment)?);
        self.storage.add_object(&key, &doc).await?;

        debug!("Role {} granted to {} by {}", issue.role, recipient, grantor);
        Ok(())
    }

    /// Drop `role` from `recipient` if `grantor` granted it. Returns whether it was removed.
    pub async fn remove_role(&self, recipient: &str, grantor: &str, role: &str) -> Result<bool> {
        let key = keys::roles(recipient);
        let mut doc = self.storage.get_object(&key).await?;

        let granted_by = doc
            .get(role)
            .and_then(|value| value.get("sender"))
            .and_then(|sender| sender.as_str());
        if granted_by != Some(grantor) {
            return Ok(false);
        }

        doc.remove(role);
        self.storage.add_object(&key, &doc).await?;

        debug!("Role {} revoked from {} by {}", role, recipient, grantor);
        Ok(true)
    }

    /// Raw role assignments of `address`, undecodable entries skipped.
    pub async fn get_assignments(&self, address: &str) -> Result<BTreeMap<String, RoleAssignment>> {
        let doc = self.storage.get_object(&keys::roles(address)).await?;

        Ok(doc
            .into_iter()
            .filter_map(|(role, value)| {
                serde_json::from_value(value)
                    .ok()
                    .map(|assignment| (role, assignment))
            })
            .collect())
    }
}
