//! Closed partition set of the MANA ledger.

use lib_types::PartitionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{ManaError, ManaResult};

/// Label of the partition minted by owner-gated collateralized purchases
pub const COLLATERALIZED_LABEL: &str = "collateralized";

/// Label of the partition minted by cooperative contributions
pub const UNCOLLATERALIZED_LABEL: &str = "uncollateralized";

/// Partition backed by external collateral
pub fn collateralized() -> PartitionId {
    PartitionId::from_label(COLLATERALIZED_LABEL)
}

/// Partition created by burning ManaToken
pub fn uncollateralized() -> PartitionId {
    PartitionId::from_label(UNCOLLATERALIZED_LABEL)
}

/// The standard two-partition configuration
pub fn default_partitions() -> Vec<PartitionId> {
    vec![collateralized(), uncollateralized()]
}

/// Set of partitions fixed at ledger construction
///
/// There is no insert or remove: the set is validated once and only
/// queried afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSet {
    partitions: BTreeSet<PartitionId>,
}

impl PartitionSet {
    /// Build the set, rejecting an empty list and duplicate identifiers
    pub fn new(partitions: impl IntoIterator<Item = PartitionId>) -> ManaResult<Self> {
        let mut set = BTreeSet::new();
        for partition in partitions {
            if !set.insert(partition) {
                return Err(ManaError::InvalidConfig(format!(
                    "duplicate partition {}",
                    partition
                )));
            }
        }

        if set.is_empty() {
            return Err(ManaError::InvalidConfig(
                "at least one partition is required".to_string(),
            ));
        }

        Ok(Self { partitions: set })
    }

    pub fn contains(&self, partition: &PartitionId) -> bool {
        self.partitions.contains(partition)
    }

    /// Fail with `UnknownPartition` unless the partition belongs to the set
    pub fn ensure_known(&self, partition: &PartitionId) -> ManaResult<()> {
        if self.contains(partition) {
            Ok(())
        } else {
            Err(ManaError::UnknownPartition(*partition))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionId> {
        self.partitions.iter()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}
