//! Accounting invariants across both ledgers.

use lib_types::{Address, Amount, PartitionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::partitions::uncollateralized;
use crate::system::ManaState;

/// Totals observed while checking the invariants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSummary {
    pub token_supply: Amount,
    pub token_holders: usize,
    pub burned: Amount,
    pub mana_supply: Amount,
    pub mana_holders: usize,
    pub partition_supply: BTreeMap<PartitionId, Amount>,
}

/// A broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// Sum of ManaToken balances differs from its total supply
    TokenSupplyMismatch { balances: Amount, total_supply: Amount },
    /// initial - current supply differs from the burned amount
    BurnMismatch { initial: Amount, current: Amount, burned: Amount },
    /// Burns happened outside cooperative contributions
    ContributionMismatch { burned: Amount, contributed: Amount },
    /// Sum of holder balances in a partition differs from its supply
    PartitionSupplyMismatch { partition: PartitionId, balances: Amount, supply: Amount },
    /// Holder total differs from the sum of its partitions
    HolderTotalMismatch { holder: Address, partitions: Amount, total: Amount },
    /// Sum of partition supplies differs from the MANA total supply
    ManaSupplyMismatch { partitions: Amount, total_supply: Amount },
    /// Less uncollateralized MANA exists than was contributed
    UncollateralizedShortfall { supply: Amount, contributed: Amount },
    /// Balance held in a partition outside the closed set
    UnknownPartitionBalance { holder: Address, partition: PartitionId },
    /// A running sum overflowed
    Overflow,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::TokenSupplyMismatch { balances, total_supply } => write!(
                f,
                "token balances ({}) != total supply ({})",
                balances, total_supply
            ),
            InvariantViolation::BurnMismatch { initial, current, burned } => write!(
                f,
                "initial ({}) - current ({}) != burned ({})",
                initial, current, burned
            ),
            InvariantViolation::ContributionMismatch { burned, contributed } => write!(
                f,
                "burned ({}) != contributed ({})",
                burned, contributed
            ),
            InvariantViolation::PartitionSupplyMismatch { partition, balances, supply } => write!(
                f,
                "partition {:?} balances ({}) != supply ({})",
                partition, balances, supply
            ),
            InvariantViolation::HolderTotalMismatch { holder, partitions, total } => write!(
                f,
                "holder {} partitions ({}) != total ({})",
                holder, partitions, total
            ),
            InvariantViolation::ManaSupplyMismatch { partitions, total_supply } => write!(
                f,
                "partition supplies ({}) != MANA total supply ({})",
                partitions, total_supply
            ),
            InvariantViolation::UncollateralizedShortfall { supply, contributed } => write!(
                f,
                "uncollateralized supply ({}) < contributed ({})",
                supply, contributed
            ),
            InvariantViolation::UnknownPartitionBalance { holder, partition } => write!(
                f,
                "holder {} has balance in unknown partition {:?}",
                holder, partition
            ),
            InvariantViolation::Overflow => write!(f, "overflow while summing balances"),
        }
    }
}

/// Check every invariant, returning a summary or all violations found
pub fn check_invariants(state: &ManaState) -> Result<StateSummary, Vec<InvariantViolation>> {
    let mut violations = Vec::new();
    let token = &state.token;
    let mana = &state.mana;

    // ManaToken: sum(balances) == total_supply
    let balances = sum(token.balances().map(|(_, amount)| *amount));
    match balances {
        Some(balances) if balances != token.total_supply() => {
            violations.push(InvariantViolation::TokenSupplyMismatch {
                balances,
                total_supply: token.total_supply(),
            });
        }
        Some(_) => {}
        None => violations.push(InvariantViolation::Overflow),
    }

    // ManaToken: initial - current == burned == contributed
    let burned_by_supply = token.initial_supply().checked_sub(token.total_supply());
    if burned_by_supply != Some(token.total_burned()) {
        violations.push(InvariantViolation::BurnMismatch {
            initial: token.initial_supply(),
            current: token.total_supply(),
            burned: token.total_burned(),
        });
    }
    if token.total_burned() != token.total_contributed() {
        violations.push(InvariantViolation::ContributionMismatch {
            burned: token.total_burned(),
            contributed: token.total_contributed(),
        });
    }

    // MANA: per-partition and per-holder sums
    let mut partition_balances: BTreeMap<PartitionId, Amount> = BTreeMap::new();
    let mut overflowed = false;
    for (holder, parts) in mana.holders() {
        let mut holder_sum: Amount = 0;
        for (partition, amount) in parts {
            if !mana.partitions().contains(partition) {
                violations.push(InvariantViolation::UnknownPartitionBalance {
                    holder: *holder,
                    partition: *partition,
                });
            }
            let entry = partition_balances.entry(*partition).or_insert(0);
            match (entry.checked_add(*amount), holder_sum.checked_add(*amount)) {
                (Some(p), Some(h)) => {
                    *entry = p;
                    holder_sum = h;
                }
                _ => overflowed = true,
            }
        }
        let total = mana.balance_of(holder);
        if holder_sum != total {
            violations.push(InvariantViolation::HolderTotalMismatch {
                holder: *holder,
                partitions: holder_sum,
                total,
            });
        }
    }
    for (holder, total) in mana.holder_totals() {
        if mana.partitions_of(holder).is_empty() && *total != 0 {
            violations.push(InvariantViolation::HolderTotalMismatch {
                holder: *holder,
                partitions: 0,
                total: *total,
            });
        }
    }

    let mut partition_supply = BTreeMap::new();
    for (partition, supply) in mana.partition_supplies() {
        let balances = partition_balances.get(partition).copied().unwrap_or(0);
        if balances != *supply {
            violations.push(InvariantViolation::PartitionSupplyMismatch {
                partition: *partition,
                balances,
                supply: *supply,
            });
        }
        partition_supply.insert(*partition, *supply);
    }

    match sum(partition_supply.values().copied()) {
        Some(partitions) if partitions != mana.total_supply() => {
            violations.push(InvariantViolation::ManaSupplyMismatch {
                partitions,
                total_supply: mana.total_supply(),
            });
        }
        Some(_) => {}
        None => overflowed = true,
    }

    // Conservation across ledgers: every contributed unit exists as uncollateralized MANA
    let uncollateralized_supply = mana.total_supply_by_partition(&uncollateralized());
    if uncollateralized_supply < token.total_contributed() {
        violations.push(InvariantViolation::UncollateralizedShortfall {
            supply: uncollateralized_supply,
            contributed: token.total_contributed(),
        });
    }

    if overflowed {
        violations.push(InvariantViolation::Overflow);
    }

    if violations.is_empty() {
        Ok(StateSummary {
            token_supply: token.total_supply(),
            token_holders: token.holder_count(),
            burned: token.total_burned(),
            mana_supply: mana.total_supply(),
            mana_holders: mana.holders().count(),
            partition_supply,
        })
    } else {
        Err(violations)
    }
}

fn sum(amounts: impl Iterator<Item = Amount>) -> Option<Amount> {
    amounts.fold(Some(0), |acc: Option<Amount>, amount| acc?.checked_add(amount))
}
