//! Key naming conventions shared by all backends.
//!
//! Every key lives under the `lto:` namespace so the index can share a store
//! with other applications.

/// Global namespace prefix.
pub const PREFIX: &str = "lto";

/// Last fully processed block height.
pub fn processing_height() -> String {
    format!("{}:processing-height", PREFIX)
}

/// Set of transaction ids that anchored a hex hash.
pub fn anchor(hash: &str) -> String {
    format!("{}:anchor:{}", PREFIX, hash)
}

/// Last seen public key of an address.
pub fn public_key(address: &str) -> String {
    format!("{}:pub-key:{}", PREFIX, address)
}

/// Verification methods issued by a subject address.
pub fn verification_methods(address: &str) -> String {
    format!("{}:verification:{}", PREFIX, address)
}

/// Addresses associated by `address` (outgoing edges).
pub fn association_children(address: &str) -> String {
    format!("{}:assoc:{}:childs", PREFIX, address)
}

/// Addresses that associated `address` (incoming edges).
pub fn association_parents(address: &str) -> String {
    format!("{}:assoc:{}:parents", PREFIX, address)
}

/// Trust network roles granted to an address.
pub fn roles(address: &str) -> String {
    format!("{}:roles:{}", PREFIX, address)
}

/// Daily transaction counter for a type name.
pub fn tx_stats(type_name: &str, day: u64) -> String {
    format!("{}:stats:transactions:{}:{}", PREFIX, type_name, day)
}
