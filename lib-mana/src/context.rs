//! Call context: who is calling, and through which contract.

use lib_types::Address;
use serde::{Deserialize, Serialize};

use crate::errors::{ManaError, ManaResult};

/// Maximum allowed call depth to prevent runaway contract-to-contract recursion
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 10;

/// Discriminates the origin of a call for authorization purposes
///
/// - User: the caller signed the transaction, authority is `ctx.caller`
/// - Contract: a contract forwarded the call, authority is `ctx.contract`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOrigin {
    /// User-initiated call: sender is ctx.caller
    User,
    /// Contract-to-contract call: sender is ctx.contract
    Contract,
}

/// Immutable context passed to every mutating ledger operation
///
/// Authorization is derived from this context, never from user-supplied
/// parameters. The transaction executor authenticates `caller` before the
/// context is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Externally-owned account that signed the transaction
    pub caller: Address,
    /// Contract forwarding the call (zero for user calls)
    pub contract: Address,
    /// Origin of this call
    pub call_origin: CallOrigin,
    /// Current call depth (0 = top-level user call)
    pub call_depth: u32,
    /// Maximum allowed call depth
    pub max_call_depth: u32,
}

impl CallContext {
    /// Context for a call signed directly by `caller`
    pub fn user(caller: Address) -> Self {
        Self {
            caller,
            contract: Address::zero(),
            call_origin: CallOrigin::User,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// The identity the callee sees as `msg.sender`
    pub fn sender(&self) -> Address {
        match self.call_origin {
            CallOrigin::User => self.caller,
            CallOrigin::Contract => self.contract,
        }
    }

    /// Nested context for a call forwarded by `contract`
    ///
    /// The original caller is preserved; the sender becomes `contract`.
    pub fn forwarded_by(&self, contract: Address) -> ManaResult<CallContext> {
        if self.call_depth >= self.max_call_depth {
            return Err(ManaError::CallDepthExceeded {
                depth: self.call_depth,
                max: self.max_call_depth,
            });
        }

        Ok(CallContext {
            caller: self.caller,
            contract,
            call_origin: CallOrigin::Contract,
            call_depth: self.call_depth + 1,
            max_call_depth: self.max_call_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_sender_is_caller() {
        let caller = Address::new([1u8; 20]);
        let ctx = CallContext::user(caller);
        assert_eq!(ctx.sender(), caller);
        assert_eq!(ctx.call_origin, CallOrigin::User);
    }

    #[test]
    fn test_forwarded_sender_is_contract() {
        let caller = Address::new([1u8; 20]);
        let contract = Address::new([9u8; 20]);

        let nested = CallContext::user(caller).forwarded_by(contract).unwrap();
        assert_eq!(nested.sender(), contract);
        assert_eq!(nested.caller, caller);
        assert_eq!(nested.call_depth, 1);
    }

    #[test]
    fn test_call_depth_limit() {
        let mut ctx = CallContext::user(Address::new([1u8; 20]));
        ctx.max_call_depth = 2;

        let ctx = ctx.forwarded_by(Address::new([2u8; 20])).unwrap();
        let ctx = ctx.forwarded_by(Address::new([3u8; 20])).unwrap();
        let result = ctx.forwarded_by(Address::new([4u8; 20]));

        assert!(matches!(
            result,
            Err(ManaError::CallDepthExceeded { depth: 2, max: 2 })
        ));
    }
}
