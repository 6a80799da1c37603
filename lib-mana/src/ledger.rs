//! PartitionLedger ("MANA")
//!
//! Partitioned governance ledger. Every holder balance is split into
//! partitions from a closed set fixed at construction. Only the controller
//! may mint; holders and operators may move partition balances.

use lib_types::{Address, Amount, PartitionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::context::CallContext;
use crate::errors::{ManaError, ManaResult};
use crate::events::{EventRecord, ManaEvent};
use crate::operators::OperatorRegistry;
use crate::partitions::PartitionSet;

pub const MANA_NAME: &str = "MANA";
pub const MANA_SYMBOL: &str = "MANA";
pub const MANA_DECIMALS: u8 = 18;

/// Partitioned balance table with a single minting controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionLedger {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Contract address
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,

    // =========================================================================
    // Authorities
    // =========================================================================
    /// Sole identity allowed to mint (exposed as `owner()`)
    controller: Address,
    /// Addresses allowed to move any holder's partition balance
    operators: OperatorRegistry,
    /// Partitions accepted by every operation
    partitions: PartitionSet,

    // =========================================================================
    // Ledger State
    // =========================================================================
    /// holder -> partition -> amount; zero entries are pruned
    balances: BTreeMap<Address, BTreeMap<PartitionId, Amount>>,
    /// holder -> sum over partitions
    holder_totals: BTreeMap<Address, Amount>,
    /// partition -> sum over holders
    partition_supply: BTreeMap<PartitionId, Amount>,
    /// Sum over all partitions
    total_supply: Amount,

    /// Events emitted by the running transaction
    #[serde(skip)]
    pending_events: Vec<EventRecord>,
}

impl PartitionLedger {
    /// Deploy the ledger at `address` with `deployer` as initial controller
    pub fn new(
        address: Address,
        deployer: Address,
        operators: OperatorRegistry,
        partitions: PartitionSet,
    ) -> ManaResult<Self> {
        if address.is_zero() {
            return Err(ManaError::ZeroAddress(
                "ledger address cannot be zero".to_string(),
            ));
        }
        if deployer.is_zero() {
            return Err(ManaError::ZeroAddress(
                "controller cannot be the zero address".to_string(),
            ));
        }

        info!(
            %address,
            controller = %deployer,
            operators = operators.len(),
            partitions = partitions.len(),
            "MANA ledger deployed"
        );

        let partition_supply = partitions.iter().map(|p| (*p, 0)).collect();
        let mut ledger = Self {
            address,
            name: MANA_NAME.to_string(),
            symbol: MANA_SYMBOL.to_string(),
            decimals: MANA_DECIMALS,
            controller: deployer,
            operators,
            partitions,
            balances: BTreeMap::new(),
            holder_totals: BTreeMap::new(),
            partition_supply,
            total_supply: 0,
            pending_events: Vec::new(),
        };
        ledger.emit(ManaEvent::OwnershipTransferred {
            previous: Address::zero(),
            new: deployer,
        });
        Ok(ledger)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Current controller (the only identity allowed to mint)
    pub fn owner(&self) -> Address {
        self.controller
    }

    /// Alias of [`owner`](Self::owner)
    pub fn controller(&self) -> Address {
        self.controller
    }

    pub fn is_operator(&self, address: &Address) -> bool {
        self.operators.is_operator(address)
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Supply of one partition; 0 for partitions outside the set
    pub fn total_supply_by_partition(&self, partition: &PartitionId) -> Amount {
        self.partition_supply.get(partition).copied().unwrap_or(0)
    }

    /// Holder's balance in one partition; 0 if never credited
    pub fn balance_of_by_partition(&self, holder: &Address, partition: &PartitionId) -> Amount {
        self.balances
            .get(holder)
            .and_then(|parts| parts.get(partition))
            .copied()
            .unwrap_or(0)
    }

    /// Holder's total across all partitions
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.holder_totals.get(holder).copied().unwrap_or(0)
    }

    /// Partitions in which the holder has a non-zero balance
    pub fn partitions_of(&self, holder: &Address) -> Vec<PartitionId> {
        self.balances
            .get(holder)
            .map(|parts| parts.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every holder with a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &BTreeMap<PartitionId, Amount>)> {
        self.balances.iter()
    }

    pub(crate) fn holder_totals(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.holder_totals.iter()
    }

    pub(crate) fn partition_supplies(&self) -> impl Iterator<Item = (&PartitionId, &Amount)> {
        self.partition_supply.iter()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Mint `amount` into `partition` for `to`
    ///
    /// # Errors
    /// - `NotController`: sender is not the controller
    /// - `UnknownPartition`: partition outside the closed set
    /// - `InvalidAmount`: amount is zero
    /// - `ZeroAddress`: recipient is the zero address
    pub fn mint_by_partition(
        &mut self,
        ctx: &CallContext,
        partition: PartitionId,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        let sender = ctx.sender();
        if sender != self.controller {
            warn!(%sender, controller = %self.controller, "MANA mint rejected: not controller");
            return Err(ManaError::NotController { caller: sender });
        }
        self.partitions.ensure_known(&partition)?;
        if amount == 0 {
            return Err(ManaError::InvalidAmount(
                "mint amount must be positive".to_string(),
            ));
        }
        if to.is_zero() {
            return Err(ManaError::ZeroAddress(
                "cannot mint to the zero address".to_string(),
            ));
        }

        let new_total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(ManaError::Overflow)?;
        self.credit(&partition, &to, amount)?;
        self.total_supply = new_total_supply;

        let supply = self.partition_supply.entry(partition).or_insert(0);
        *supply = supply.checked_add(amount).ok_or(ManaError::Overflow)?;

        debug!(?partition, %to, amount, "MANA issued by partition");
        self.emit(ManaEvent::IssuedByPartition {
            partition,
            operator: sender,
            to,
            amount,
        });
        Ok(())
    }

    /// Move `amount` of `partition` from `from` to `to`
    ///
    /// The sender must be `from` itself or an operator.
    ///
    /// # Errors
    /// - `UnknownPartition`, `InvalidAmount`, `ZeroAddress`
    /// - `Unauthorized`: sender is neither holder nor operator
    /// - `InsufficientPartitionBalance`: `from` holds less than `amount`
    pub fn transfer_by_partition(
        &mut self,
        ctx: &CallContext,
        partition: PartitionId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        self.partitions.ensure_known(&partition)?;
        if amount == 0 {
            return Err(ManaError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }
        if to.is_zero() {
            return Err(ManaError::ZeroAddress(
                "cannot transfer to the zero address".to_string(),
            ));
        }

        let sender = ctx.sender();
        if sender != from && !self.operators.is_operator(&sender) {
            warn!(%sender, %from, "MANA partition transfer rejected: not holder or operator");
            return Err(ManaError::Unauthorized(format!(
                "{} is neither the holder nor an operator",
                sender
            )));
        }

        let have = self.balance_of_by_partition(&from, &partition);
        if have < amount {
            return Err(ManaError::InsufficientPartitionBalance {
                partition,
                have,
                need: amount,
            });
        }

        self.debit(&partition, &from, amount)?;
        self.credit(&partition, &to, amount)?;

        debug!(?partition, %from, %to, amount, "MANA transferred by partition");
        self.emit(ManaEvent::TransferByPartition {
            partition,
            operator: sender,
            from,
            to,
            amount,
        });
        Ok(())
    }

    /// Hand control (minting rights) to `new_controller`
    ///
    /// # Errors
    /// - `Unauthorized`: sender is not the current controller
    /// - `ZeroAddress`: new controller is the zero address
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_controller: Address,
    ) -> ManaResult<()> {
        let sender = ctx.sender();
        if sender != self.controller {
            warn!(%sender, "MANA ownership transfer rejected");
            return Err(ManaError::not_owner());
        }
        if new_controller.is_zero() {
            return Err(ManaError::ZeroAddress(
                "Ownable: new owner is the zero address".to_string(),
            ));
        }

        let previous = self.controller;
        self.controller = new_controller;

        info!(%previous, new = %new_controller, "MANA controller transferred");
        self.emit(ManaEvent::OwnershipTransferred {
            previous,
            new: new_controller,
        });
        Ok(())
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn emit(&mut self, event: ManaEvent) {
        self.pending_events.push(EventRecord {
            emitter: self.address,
            event,
        });
    }

    fn credit(&mut self, partition: &PartitionId, holder: &Address, amount: Amount) -> ManaResult<()> {
        let total = self.balance_of(holder).checked_add(amount).ok_or(ManaError::Overflow)?;
        let balance = self
            .balance_of_by_partition(holder, partition)
            .checked_add(amount)
            .ok_or(ManaError::Overflow)?;

        self.balances
            .entry(*holder)
            .or_default()
            .insert(*partition, balance);
        self.holder_totals.insert(*holder, total);
        Ok(())
    }

    fn debit(&mut self, partition: &PartitionId, holder: &Address, amount: Amount) -> ManaResult<()> {
        let total = self.balance_of(holder).checked_sub(amount).ok_or(ManaError::Underflow)?;
        let balance = self
            .balance_of_by_partition(holder, partition)
            .checked_sub(amount)
            .ok_or(ManaError::Underflow)?;

        if let Some(parts) = self.balances.get_mut(holder) {
            if balance == 0 {
                parts.remove(partition);
            } else {
                parts.insert(*partition, balance);
            }
            if parts.is_empty() {
                self.balances.remove(holder);
            }
        }
        if total == 0 {
            self.holder_totals.remove(holder);
        } else {
            self.holder_totals.insert(*holder, total);
        }
        Ok(())
    }
}
