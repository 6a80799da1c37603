//! ManaSystem: single-writer unit of work over both ledgers
//!
//! Every mutating call runs inside [`ManaSystem::transaction`], which works on
//! a copy of the MANA ledger and the ManaToken together and swaps the copy in
//! only if the whole call succeeds. A failure anywhere, including in the
//! second ledger of a cross-contract call, leaves no trace: no balance change
//! and no published event.
//!
//! The working copy is a full clone of both ledgers, so every call costs
//! time proportional to the number of holders. Fine for interactive calls;
//! not meant for bulk replay.

use lib_types::{Address, Amount, PartitionId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::CallContext;
use crate::errors::{ManaError, ManaResult};
use crate::events::{publish, EventRecord, EventSink};
use crate::invariants::{check_invariants, InvariantViolation, StateSummary};
use crate::ledger::PartitionLedger;
use crate::token::UtilityToken;

/// Complete state of the two-contract system
///
/// Read-only outside the crate; mutations go through [`ManaSystem`].
///
/// ```compile_fail
/// use lib_mana::{ManaState, UtilityToken};
///
/// fn replace_token(state: &mut ManaState, token: UtilityToken) {
///     state.token = token;
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaState {
    /// Account that deployed both contracts
    pub(crate) deployer: Address,
    /// Partitioned governance ledger
    pub(crate) mana: PartitionLedger,
    /// Fungible utility token
    pub(crate) token: UtilityToken,
    /// Events of the running transaction in emission order
    #[serde(skip)]
    journal: Vec<EventRecord>,
}

impl ManaState {
    pub fn new(deployer: Address, mana: PartitionLedger, token: UtilityToken) -> Self {
        Self {
            deployer,
            mana,
            token,
            journal: Vec::new(),
        }
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn mana(&self) -> &PartitionLedger {
        &self.mana
    }

    pub fn token(&self) -> &UtilityToken {
        &self.token
    }

    /// Move events buffered by the contracts into the transaction journal
    ///
    /// Called after each contract step so the journal keeps cross-contract
    /// emission order.
    pub(crate) fn collect_events(&mut self) {
        let token_events = self.token.drain_events();
        self.journal.extend(token_events);
        let mana_events = self.mana.drain_events();
        self.journal.extend(mana_events);
    }

    fn take_journal(&mut self) -> Vec<EventRecord> {
        self.collect_events();
        std::mem::take(&mut self.journal)
    }
}

/// Owner of both ledgers and the event sink
///
/// The only way to change committed state is through its authorized
/// operations:
///
/// ```compile_fail
/// fn bypass(system: &mut lib_mana::ManaSystem) {
///     let _ = system.transaction(|_| Ok(()));
/// }
/// ```
pub struct ManaSystem {
    state: ManaState,
    sink: Box<dyn EventSink>,
}

impl std::fmt::Debug for ManaSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManaSystem")
            .field("mana", &self.state.mana.address())
            .field("token", &self.state.token.address())
            .finish()
    }
}

impl ManaSystem {
    /// Wrap an existing state; pending construction events are published
    pub fn from_state(state: ManaState, sink: Box<dyn EventSink>) -> Self {
        let mut system = Self { state, sink };
        let records = system.state.take_journal();
        publish(system.sink.as_mut(), records);
        system
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> &ManaState {
        &self.state
    }

    /// The MANA ledger
    pub fn mana(&self) -> &PartitionLedger {
        &self.state.mana
    }

    /// The ManaToken
    pub fn token(&self) -> &UtilityToken {
        &self.state.token
    }

    pub fn deployer(&self) -> Address {
        self.state.deployer
    }

    /// Verify every accounting invariant of the current state
    pub fn check_invariants(&self) -> Result<StateSummary, Vec<InvariantViolation>> {
        check_invariants(&self.state)
    }

    /// blake3 digest of the encoded state
    ///
    /// Deterministic: every table is an ordered map.
    pub fn state_root(&self) -> ManaResult<[u8; 32]> {
        let encoded =
            bincode::serialize(&self.state).map_err(|e| ManaError::Storage(e.to_string()))?;
        Ok(*blake3::hash(&encoded).as_bytes())
    }

    // =========================================================================
    // Unit of work
    // =========================================================================

    /// Run `f` atomically against both ledgers
    ///
    /// If `f` returns an error, the working copy is dropped and neither the
    /// state nor the event sink observes anything.
    pub(crate) fn transaction<F, R>(&mut self, f: F) -> ManaResult<R>
    where
        F: FnOnce(&mut ManaState) -> ManaResult<R>,
    {
        let mut working = self.state.clone();
        match f(&mut working) {
            Ok(result) => {
                let records = working.take_journal();
                self.state = working;
                debug!(events = records.len(), "transaction committed");
                publish(self.sink.as_mut(), records);
                Ok(result)
            }
            Err(e) => {
                warn!("transaction reverted: {}", e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // ManaToken calls
    // =========================================================================

    pub fn transfer(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> ManaResult<()> {
        self.transaction(|state| state.token.transfer(ctx, to, amount))
    }

    pub fn approve(&mut self, ctx: &CallContext, spender: Address, amount: Amount) -> ManaResult<()> {
        self.transaction(|state| state.token.approve(ctx, spender, amount))
    }

    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        self.transaction(|state| state.token.transfer_from(ctx, from, to, amount))
    }

    pub fn transfer_token_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> ManaResult<()> {
        self.transaction(|state| state.token.transfer_ownership(ctx, new_owner))
    }

    pub fn renounce_token_ownership(&mut self, ctx: &CallContext) -> ManaResult<()> {
        self.transaction(|state| state.token.renounce_ownership(ctx))
    }

    // =========================================================================
    // MANA calls
    // =========================================================================

    /// Direct mint on the MANA ledger; only succeeds for its controller
    pub fn mint_by_partition(
        &mut self,
        ctx: &CallContext,
        partition: PartitionId,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        self.transaction(|state| state.mana.mint_by_partition(ctx, partition, to, amount))
    }

    pub fn transfer_by_partition(
        &mut self,
        ctx: &CallContext,
        partition: PartitionId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ManaResult<()> {
        self.transaction(|state| state.mana.transfer_by_partition(ctx, partition, from, to, amount))
    }

    /// Reassign the MANA controller
    pub fn transfer_mana_ownership(
        &mut self,
        ctx: &CallContext,
        new_controller: Address,
    ) -> ManaResult<()> {
        self.transaction(|state| state.mana.transfer_ownership(ctx, new_controller))
    }
}
