//! Public keys and verification methods.
//!
//! A verification method is an association whose type falls in the
//! verification range. The subject (sender) owns one document mapping each
//! recipient to its [`VerificationMethod`]. Revoking stamps `revokedAt`;
//! entries are never removed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use lto_index_core::{Transaction, TX_ASSOCIATION, TX_REVOKE_ASSOCIATION};

use crate::error::Result;
use crate::storage::{keys, Document, Storage};

/// Relationship bitmask carried in the low byte of the association type.
const RELATIONSHIP_MASK: u64 = 0xff;

/// A verification method granted by a subject to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Relationship bitmask (authentication, assertion, ...).
    pub relationships: u64,
    /// Subject address that registered the method.
    pub sender: String,
    /// Registration timestamp (unix milliseconds).
    pub created_at: u64,
    /// Revocation timestamp, once revoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<u64>,
}

impl VerificationMethod {
    /// Whether the method has not been revoked.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// A verification method together with its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationMethodEntry {
    /// Address the method was granted to.
    pub recipient: String,
    /// The method itself.
    #[serde(flatten)]
    pub method: VerificationMethod,
}

/// Identity index: last seen public keys and verification methods.
#[derive(Clone)]
pub struct IdentityIndex {
    storage: Arc<dyn Storage>,
}

impl IdentityIndex {
    /// Create a new identity index.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Remember the sender public key, when the transaction carries one.
    pub async fn save_public_key(&self, tx: &Transaction) -> Result<bool> {
        let (Some(sender), Some(public_key)) =
            (tx.sender_address(), tx.sender_public_key.as_deref())
        else {
            return Ok(false);
        };

        self.storage
            .set_value(&keys::public_key(sender), public_key)
            .await?;
        Ok(true)
    }

    /// Last public key seen for `address`.
    pub async fn get_public_key(&self, address: &str) -> Result<Option<String>> {
        self.storage.get_value(&keys::public_key(address)).await
    }

    /// Route a verification-method association. Returns whether anything was written.
    pub async fn index(&self, tx: &Transaction) -> Result<bool> {
        if !tx.is_verification_method() {
            return Ok(false);
        }

        match tx.tx_type {
            TX_ASSOCIATION => self.save_verification_method(tx).await,
            TX_REVOKE_ASSOCIATION => self.revoke_verification_method(tx).await,
            _ => Ok(false),
        }
    }

    /// Register the method granted by `tx`.
    ///
    /// Transactions without a sender or counterparty write nothing.
    pub async fn save_verification_method(&self, tx: &Transaction) -> Result<bool> {
        let (Some(sender), Some(recipient)) = (tx.sender_address(), tx.association_party()) else {
            return Ok(false);
        };

        let method = VerificationMethod {
            relationships: tx.association_type.unwrap_or_default() & RELATIONSHIP_MASK,
            sender: sender.to_string(),
            created_at: tx.timestamp,
            revoked_at: None,
        };

        let key = keys::verification_methods(sender);
        let mut doc = self.storage.get_object(&key).await?;
        doc.insert(recipient.to_string(), serde_json::to_value(&method)?);
        self.storage.add_object(&key, &doc).await?;

        debug!(
            "Verification method {} -> {} ({:#x})",
            sender, recipient, method.relationships
        );
        Ok(true)
    }

    /// Mark the method for the counterparty of `tx` as revoked.
    ///
    /// Revoking an unknown method writes nothing.
    pub async fn revoke_verification_method(&self, tx: &Transaction) -> Result<bool> {
        let (Some(sender), Some(recipient)) = (tx.sender_address(), tx.association_party()) else {
            return Ok(false);
        };

        let key = keys::verification_methods(sender);
        let mut doc = self.storage.get_object(&key).await?;

        let Some(mut method) = decode_method(&doc, recipient) else {
            return Ok(false);
        };
        method.revoked_at = Some(tx.timestamp);
        doc.insert(recipient.to_string(), serde_json::to_value(&method)?);
        self.storage.add_object(&key, &doc).await?;

        debug!("Verification method {} -> {} revoked", sender, recipient);
        Ok(true)
    }

    /// Verification methods registered by `address`, ordered by recipient.
    pub async fn get_verification_methods(
        &self,
        address: &str,
        include_revoked: bool,
    ) -> Result<Vec<VerificationMethodEntry>> {
        let doc = self
            .storage
            .get_object(&keys::verification_methods(address))
            .await?;

        let mut entries: Vec<VerificationMethodEntry> = doc
            .keys()
            .filter_map(|recipient| {
                decode_method(&doc, recipient).map(|method| VerificationMethodEntry {
                    recipient: recipient.clone(),
                    method,
                })
            })
            .filter(|entry| include_revoked || entry.method.is_active())
            .collect();

        entries.sort_by(|a, b| a.recipient.cmp(&b.recipient));
        Ok(entries)
    }
}

// Entries written by other tools may not match; those are ignored
fn decode_method(doc: &Document, recipient: &str) -> Option<VerificationMethod> {
    doc.get(recipient)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}
