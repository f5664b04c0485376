//! Chain data model as returned by the node REST API.

use serde::{Deserialize, Serialize};

use crate::constants::{tx_type_name, MS_PER_DAY, VERIFICATION_METHOD_TYPES};

/// A block at a given height. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block height.
    pub height: u64,

    /// Block timestamp (unix milliseconds).
    #[serde(default)]
    pub timestamp: u64,

    /// Transactions in block order.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// A single transfer inside a mass transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Receiving address.
    pub recipient: String,

    /// Amount in the smallest unit.
    #[serde(default)]
    pub amount: u64,
}

/// A key/value entry of a data transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    /// Entry key.
    pub key: String,

    /// Value type as reported by the node (`binary`, `string`, `integer`, `boolean`).
    #[serde(rename = "type", default)]
    pub value_type: String,

    /// Raw value.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl DataEntry {
    /// The value as a string, if it is one.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }
}

/// A transaction as embedded in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction id (base58).
    pub id: String,

    /// Numeric type tag.
    #[serde(rename = "type")]
    pub tx_type: u8,

    /// Sending address. Empty for genesis transactions, which have none.
    #[serde(default)]
    pub sender: String,

    /// Sender public key, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<String>,

    /// Transaction timestamp (unix milliseconds).
    #[serde(default)]
    pub timestamp: u64,

    /// Receiving address for single-recipient types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Transfers of a mass transfer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<Transfer>,

    /// Legacy data entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<DataEntry>,

    /// Base58 encoded anchor hashes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<String>,

    /// Association counterparty (older association format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party: Option<String>,

    /// Association type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_type: Option<u64>,
}

impl Transaction {
    /// Type name from the static type table.
    pub fn type_name(&self) -> &'static str {
        tx_type_name(self.tx_type)
    }

    /// Sending address, if the transaction has one.
    pub fn sender_address(&self) -> Option<&str> {
        Some(self.sender.as_str()).filter(|s| !s.is_empty())
    }

    /// Counterparty of an association.
    ///
    /// Newer association transactions carry the party as `recipient`.
    pub fn association_party(&self) -> Option<&str> {
        self.party.as_deref().or(self.recipient.as_deref())
    }

    /// Whether this association registers a verification method.
    pub fn is_verification_method(&self) -> bool {
        self.association_type
            .is_some_and(|t| VERIFICATION_METHOD_TYPES.contains(&t))
    }

    /// Recipients in index order: the direct recipient, an association party
    /// given separately, then every transfer.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        let party = self
            .party
            .as_deref()
            .filter(|p| Some(*p) != self.recipient.as_deref());

        self.recipient
            .as_deref()
            .into_iter()
            .chain(party)
            .chain(self.transfers.iter().map(|t| t.recipient.as_str()))
    }

    /// Calendar day number used for statistics buckets.
    pub fn day(&self) -> u64 {
        self.timestamp / MS_PER_DAY
    }
}
