//! MANA Ledger Errors

use lib_types::{Address, Amount, PartitionId};
use thiserror::Error;

/// Revert message of an owner-gated call made by anyone but the owner
pub const NOT_OWNER: &str = "Ownable: caller is not the owner";

/// Error during ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManaError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unauthorized: caller {caller} is not the controller")]
    NotController { caller: Address },

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient partition balance in {partition}: have {have}, need {need}")]
    InsufficientPartitionBalance {
        partition: PartitionId,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Unknown partition: {0}")]
    UnknownPartition(PartitionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Zero address: {0}")]
    ZeroAddress(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(#[source] Box<ManaError>),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Call depth limit exceeded: {depth} >= {max}")]
    CallDepthExceeded { depth: u32, max: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ManaError {
    /// Owner-gated call rejected
    pub fn not_owner() -> Self {
        ManaError::Unauthorized(NOT_OWNER.to_string())
    }

    /// True for every rejection caused by the caller lacking a role
    /// (controller, operator, owner or holder).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ManaError::Unauthorized(_) | ManaError::NotController { .. }
        )
    }

    /// The rejection that caused a failed conversion, if this is one
    pub fn conversion_cause(&self) -> Option<&ManaError> {
        match self {
            ManaError::ConversionFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ManaError {
    fn from(err: anyhow::Error) -> Self {
        ManaError::Storage(format!("{:#}", err))
    }
}

/// Result type for ledger operations
pub type ManaResult<T> = Result<T, ManaError>;
