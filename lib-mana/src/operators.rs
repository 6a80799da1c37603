//! Operator registry: addresses with elevated transfer rights on the MANA ledger.

use lib_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{ManaError, ManaResult};

/// Capability set fixed at ledger construction
///
/// Operators may move any holder's partition balance. Membership is
/// recorded once; there is no add or remove after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRegistry {
    operators: BTreeSet<Address>,
}

impl OperatorRegistry {
    /// Build the registry, rejecting the zero address and duplicates
    pub fn new(operators: impl IntoIterator<Item = Address>) -> ManaResult<Self> {
        let mut set = BTreeSet::new();
        for operator in operators {
            if operator.is_zero() {
                return Err(ManaError::ZeroAddress(
                    "operator cannot be the zero address".to_string(),
                ));
            }
            if !set.insert(operator) {
                return Err(ManaError::InvalidConfig(format!(
                    "duplicate operator {}",
                    operator
                )));
            }
        }
        Ok(Self { operators: set })
    }

    /// Check if an address holds the operator capability
    pub fn is_operator(&self, address: &Address) -> bool {
        self.operators.contains(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}
