//! Ownership Transfer Protocol
//!
//! Deployment sequencing for the two contracts:
//!
//! 1. deploy the MANA ledger with operators and partitions (deployer controls it)
//! 2. deploy the ManaToken with the initial supply and the ledger address
//! 3. hand MANA control from the deployer to the ManaToken contract
//!
//! After step 3 the conversion engine is the only path that can mint MANA.
//! The ledger still permits re-transfer; [`ControllerState`] reports when the
//! controller has moved away from the token.

use lib_types::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GenesisConfig;
use crate::context::CallContext;
use crate::errors::{ManaError, ManaResult};
use crate::events::EventSink;
use crate::ledger::PartitionLedger;
use crate::operators::OperatorRegistry;
use crate::partitions::PartitionSet;
use crate::system::{ManaState, ManaSystem};
use crate::token::UtilityToken;

/// Deployment nonce of the MANA ledger
pub const MANA_DEPLOY_NONCE: u64 = 0;

/// Deployment nonce of the ManaToken
pub const TOKEN_DEPLOY_NONCE: u64 = 1;

/// Who currently controls MANA minting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// Handoff not yet performed
    Deployer,
    /// Terminal state of the deployment sequence
    UtilityToken,
    /// Control was re-transferred elsewhere; conversions will fail
    External(Address),
}

impl ManaSystem {
    /// Run the full deployment sequence described by `config`
    pub fn deploy(config: &GenesisConfig, sink: Box<dyn EventSink>) -> ManaResult<Self> {
        config.validate()?;
        let deployer = config.deployer;

        let mana_address = Address::derive_contract(&deployer, MANA_DEPLOY_NONCE);
        let mana = PartitionLedger::new(
            mana_address,
            deployer,
            OperatorRegistry::new(config.operators.iter().copied())?,
            PartitionSet::new(config.partition_ids())?,
        )?;

        let token_address = Address::derive_contract(&deployer, TOKEN_DEPLOY_NONCE);
        let token = UtilityToken::new(token_address, deployer, config.initial_supply, mana_address)?;

        let mut system = ManaSystem::from_state(ManaState::new(deployer, mana, token), sink);
        system.hand_off_control(&CallContext::user(deployer))?;

        if !system.is_handoff_complete() {
            return Err(ManaError::InvalidConfig(
                "MANA controller did not end at the ManaToken".to_string(),
            ));
        }

        info!(mana = %mana_address, token = %token_address, %deployer, "MANA system deployed");
        Ok(system)
    }

    /// Transfer MANA control to the ManaToken contract
    ///
    /// Must be called by the current controller.
    pub fn hand_off_control(&mut self, ctx: &CallContext) -> ManaResult<()> {
        self.transaction(|state| {
            let token_address = state.token.address();
            state.mana.transfer_ownership(ctx, token_address)
        })
    }

    /// Classify the MANA controller
    pub fn controller_state(&self) -> ControllerState {
        let controller = self.mana().controller();
        if controller == self.token().address() {
            ControllerState::UtilityToken
        } else if controller == self.deployer() {
            ControllerState::Deployer
        } else {
            ControllerState::External(controller)
        }
    }

    /// True once the ManaToken controls MANA minting
    pub fn is_handoff_complete(&self) -> bool {
        let complete = self.controller_state() == ControllerState::UtilityToken;
        if !complete {
            warn!(controller = %self.mana().controller(), "MANA controller is not the ManaToken");
        }
        complete
    }
}
