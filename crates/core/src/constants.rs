//! Canonical constants for the LTO chain.
//!
//! Transaction type tags and data markers as produced by the public node.

/// Genesis transaction.
pub const TX_GENESIS: u8 = 1;
/// Token transfer.
pub const TX_TRANSFER: u8 = 4;
/// Lease.
pub const TX_LEASE: u8 = 8;
/// Cancel lease.
pub const TX_CANCEL_LEASE: u8 = 9;
/// Mass transfer (one sender, many recipients).
pub const TX_MASS_TRANSFER: u8 = 11;
/// Data transaction. Legacy anchors are carried as data entries.
pub const TX_DATA: u8 = 12;
/// Set script.
pub const TX_SET_SCRIPT: u8 = 13;
/// Native anchor.
pub const TX_ANCHOR: u8 = 15;
/// Create association.
pub const TX_ASSOCIATION: u8 = 16;
/// Revoke association.
pub const TX_REVOKE_ASSOCIATION: u8 = 17;
/// Sponsorship.
pub const TX_SPONSORSHIP: u8 = 18;
/// Cancel sponsorship.
pub const TX_CANCEL_SPONSORSHIP: u8 = 19;
/// Register public keys.
pub const TX_REGISTER: u8 = 20;
/// Burn.
pub const TX_BURN: u8 = 21;
/// Mapped anchor.
pub const TX_MAPPED_ANCHOR: u8 = 22;
/// Statement.
pub const TX_STATEMENT: u8 = 23;

/// Static table of type tag to type name.
///
/// Type 12 is named `anchor` because data transactions were the original
/// anchoring mechanism and share the anchor history with type 15.
pub const TX_TYPE_NAMES: [(u8, &str); 16] = [
    (TX_GENESIS, "genesis"),
    (TX_TRANSFER, "transfer"),
    (TX_LEASE, "lease"),
    (TX_CANCEL_LEASE, "cancel_lease"),
    (TX_MASS_TRANSFER, "mass_transfer"),
    (TX_DATA, "anchor"),
    (TX_SET_SCRIPT, "script"),
    (TX_ANCHOR, "anchor"),
    (TX_ASSOCIATION, "association"),
    (TX_REVOKE_ASSOCIATION, "revoke_association"),
    (TX_SPONSORSHIP, "sponsorship"),
    (TX_CANCEL_SPONSORSHIP, "cancel_sponsorship"),
    (TX_REGISTER, "register"),
    (TX_BURN, "burn"),
    (TX_MAPPED_ANCHOR, "mapped_anchor"),
    (TX_STATEMENT, "statement"),
];

/// Name used for tags missing from [`TX_TYPE_NAMES`].
pub const TX_TYPE_UNKNOWN: &str = "unknown";

/// Types whose recipients are indexed alongside the sender.
pub const RECIPIENT_TX_TYPES: [u8; 8] = [
    TX_GENESIS,
    TX_TRANSFER,
    TX_LEASE,
    TX_MASS_TRANSFER,
    TX_ASSOCIATION,
    TX_REVOKE_ASSOCIATION,
    TX_SPONSORSHIP,
    TX_CANCEL_SPONSORSHIP,
];

/// Data entry key marking a legacy anchor (`⚓anchor`).
pub const ANCHOR_DATA_KEY: &str = "\u{2693}anchor";

/// Prefix of base64 encoded binary data entry values.
pub const BASE64_VALUE_PREFIX: &str = "base64:";

/// Association types in this range register a verification method.
/// The low byte carries the relationship bitmask.
pub const VERIFICATION_METHOD_TYPES: std::ops::RangeInclusive<u64> = 0x100..=0x1ff;

/// Milliseconds per calendar day, used to bucket statistics.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Resolve the type name for a numeric type tag.
pub fn tx_type_name(tx_type: u8) -> &'static str {
    TX_TYPE_NAMES
        .iter()
        .find_map(|(tag, name)| (*tag == tx_type).then_some(*name))
        .unwrap_or(TX_TYPE_UNKNOWN)
}

/// Check whether a type indexes its recipients.
pub fn indexes_recipients(tx_type: u8) -> bool {
    RECIPIENT_TX_TYPES.contains(&tx_type)
}
