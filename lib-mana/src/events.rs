//! Ledger Event Emission
//!
//! Contracts buffer the events they emit while a transaction runs. The
//! system publishes them to the configured [`EventSink`] only after the
//! transaction commits, so a reverted call never produces an observation.

use lib_types::{Address, Amount, PartitionId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// EVENT TYPES
// ============================================================================

/// State-change notifications consumable by off-chain indexers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ManaEvent {
    /// Fungible transfer; `to == zero` for burns
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },

    /// Fungible allowance set
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },

    /// Partition balance minted
    IssuedByPartition {
        partition: PartitionId,
        operator: Address,
        to: Address,
        amount: Amount,
    },

    /// Partition balance moved between holders
    TransferByPartition {
        partition: PartitionId,
        operator: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },

    /// Controller (MANA) or owner (ManaToken) changed
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },

    /// ManaToken burned into uncollateralized MANA
    ContributedToCooperative {
        contributor: Address,
        amount: Amount,
    },

    /// Owner minted collateralized MANA
    CollateralizedManaPurchased {
        buyer: Address,
        amount: Amount,
    },
}

impl std::fmt::Display for ManaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManaEvent::Transfer { amount, .. } => write!(f, "Transfer(amount={})", amount),
            ManaEvent::Approval { amount, .. } => write!(f, "Approval(amount={})", amount),
            ManaEvent::IssuedByPartition { partition, amount, .. } => {
                write!(f, "IssuedByPartition({:?}, amount={})", partition, amount)
            }
            ManaEvent::TransferByPartition { partition, amount, .. } => {
                write!(f, "TransferByPartition({:?}, amount={})", partition, amount)
            }
            ManaEvent::OwnershipTransferred { new, .. } => {
                write!(f, "OwnershipTransferred(new={})", new)
            }
            ManaEvent::ContributedToCooperative { amount, .. } => {
                write!(f, "ContributedToCooperative(amount={})", amount)
            }
            ManaEvent::CollateralizedManaPurchased { amount, .. } => {
                write!(f, "CollateralizedManaPurchased(amount={})", amount)
            }
        }
    }
}

/// An event together with the contract that emitted it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub emitter: Address,
    pub event: ManaEvent,
}

// ============================================================================
// EVENT SINK
// ============================================================================

/// Receiver of committed events
pub trait EventSink: Send {
    /// Called once per committed event, in emission order
    fn on_event(&mut self, record: &EventRecord) -> anyhow::Result<()>;
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _record: &EventRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory event log
///
/// Clones share the same buffer, so a caller can hand one clone to the
/// system and read committed events from another.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record received so far
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().clone()
    }

    /// Events only, without emitters
    pub fn events(&self) -> Vec<ManaEvent> {
        self.records().into_iter().map(|r| r.event).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Recovers the buffer from a poisoned lock
    fn lock(&self) -> MutexGuard<'_, Vec<EventRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, record: &EventRecord) -> anyhow::Result<()> {
        self.lock().push(record.clone());
        Ok(())
    }
}

/// Deliver records to a sink; a failing sink never aborts delivery of the rest
pub(crate) fn publish(sink: &mut dyn EventSink, records: Vec<EventRecord>) {
    for record in records {
        tracing::debug!(emitter = %record.emitter, "event {}", record.event);
        if let Err(e) = sink.on_event(&record) {
            tracing::warn!("Event sink error: {}", e);
        }
    }
}
