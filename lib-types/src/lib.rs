//! MANA ledger primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Identities and partitions are fixed-size byte values, never strings.

pub mod errors;
pub mod primitives;

pub use errors::ParseError;
pub use primitives::{keccak256, Address, Amount, PartitionId};
