//! MANA Ledger
//!
//! Accounting engine for a two-contract token system:
//!
//! - [`PartitionLedger`] ("MANA"): partitioned governance ledger whose
//!   controller is the only identity allowed to mint
//! - [`UtilityToken`] ("ManaToken"): fungible token that converts into MANA
//!
//! # Execution
//!
//! [`ManaSystem`] owns both ledgers and runs every mutating call as one
//! atomic transaction. Use [`ManaSystem::deploy`] to run the deployment
//! sequence, then [`ManaSystem::contribute_to_cooperative`] and
//! [`ManaSystem::purchase_collateralized_mana`] to convert.

pub mod config;
pub mod context;
pub mod conversion;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod ledger;
pub mod operators;
pub mod ownership;
pub mod partitions;
pub mod store;
pub mod system;
pub mod token;

pub use config::{GenesisConfig, UNIT};
pub use context::{CallContext, CallOrigin};
pub use errors::{ManaError, ManaResult, NOT_OWNER};
pub use events::{EventLog, EventRecord, EventSink, ManaEvent, NullSink};
pub use invariants::{check_invariants, InvariantViolation, StateSummary};
pub use ledger::PartitionLedger;
pub use operators::OperatorRegistry;
pub use ownership::ControllerState;
pub use partitions::{collateralized, uncollateralized, PartitionSet};
pub use store::{FileStore, MemoryStore, StateStore};
pub use system::{ManaState, ManaSystem};
pub use token::UtilityToken;

pub use lib_types::{Address, Amount, PartitionId};
