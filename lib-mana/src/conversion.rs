//! Conversion Engine
//!
//! ManaToken entry points that mint into the MANA ledger. Both calls reach
//! the ledger from the token contract's own identity, so they only succeed
//! while the token is the ledger's controller.
//!
//! # Enforcement
//!
//! - **Atomicity**: burn and mint commit together or not at all
//! - **Conservation**: every burned unit reappears as uncollateralized MANA
//! - **Authority**: collateralized issuance is owner-only

use lib_types::{Amount, PartitionId};
use tracing::info;

use crate::context::CallContext;
use crate::errors::{ManaError, ManaResult};
use crate::events::ManaEvent;
use crate::partitions::{collateralized, uncollateralized};
use crate::system::{ManaState, ManaSystem};

impl ManaSystem {
    /// Burn `amount` ManaToken from the caller and mint the same amount of
    /// uncollateralized MANA to the caller
    ///
    /// # Errors
    /// - `InvalidAmount`: amount is zero
    /// - `InsufficientBalance`: caller holds less than `amount` ManaToken
    /// - `ConversionFailed`: the MANA ledger rejected the mint; the burn is
    ///   rolled back
    pub fn contribute_to_cooperative(&mut self, ctx: &CallContext, amount: Amount) -> ManaResult<()> {
        self.transaction(|state| contribute(state, ctx, amount))
    }

    /// Mint `amount` collateralized MANA to the token owner
    ///
    /// No ManaToken is burned: collateral is held outside the ledger.
    ///
    /// # Errors
    /// - `Unauthorized`: caller is not the ManaToken owner
    /// - `InvalidAmount`: amount is zero
    /// - `ConversionFailed`: the MANA ledger rejected the mint
    pub fn purchase_collateralized_mana(&mut self, ctx: &CallContext, amount: Amount) -> ManaResult<()> {
        self.transaction(|state| purchase(state, ctx, amount))
    }
}

fn contribute(state: &mut ManaState, ctx: &CallContext, amount: Amount) -> ManaResult<()> {
    if amount == 0 {
        return Err(ManaError::InvalidAmount(
            "contribution must be positive".to_string(),
        ));
    }
    let contributor = ctx.sender();

    // 1. Burn: balances[contributor] -= amount, total_supply -= amount
    state.token.burn_contribution(contributor, amount)?;
    state.collect_events();

    // 2. Mint: uncollateralized[contributor] += amount, from the token's identity
    mint_from_token(state, ctx, uncollateralized(), amount)?;

    state.token.emit(ManaEvent::ContributedToCooperative {
        contributor,
        amount,
    });
    state.collect_events();

    info!(%contributor, amount, "cooperative contribution converted");
    Ok(())
}

fn purchase(state: &mut ManaState, ctx: &CallContext, amount: Amount) -> ManaResult<()> {
    state.token.ensure_owner(ctx)?;
    if amount == 0 {
        return Err(ManaError::InvalidAmount(
            "purchase amount must be positive".to_string(),
        ));
    }
    let buyer = ctx.sender();

    mint_from_token(state, ctx, collateralized(), amount)?;

    state.token.emit(ManaEvent::CollateralizedManaPurchased { buyer, amount });
    state.collect_events();

    info!(%buyer, amount, "collateralized MANA purchased");
    Ok(())
}

/// Forward a mint to the referenced MANA ledger as the token contract
///
/// Any rejection by the ledger is reported as `ConversionFailed`.
fn mint_from_token(
    state: &mut ManaState,
    ctx: &CallContext,
    partition: PartitionId,
    amount: Amount,
) -> ManaResult<()> {
    let recipient = ctx.sender();
    let token_address = state.token.address();

    if state.token.mana_governance_token() != state.mana.address() {
        return Err(ManaError::ConversionFailed(Box::new(ManaError::InvalidConfig(
            format!(
                "token references {} but the ledger lives at {}",
                state.token.mana_governance_token(),
                state.mana.address()
            ),
        ))));
    }

    let token_ctx = ctx
        .forwarded_by(token_address)
        .map_err(|e| ManaError::ConversionFailed(Box::new(e)))?;
    state
        .mana
        .mint_by_partition(&token_ctx, partition, recipient, amount)
        .map_err(|e| ManaError::ConversionFailed(Box::new(e)))?;
    state.collect_events();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::ledger::PartitionLedger;
    use crate::operators::OperatorRegistry;
    use crate::partitions::{default_partitions, PartitionSet};
    use crate::token::UtilityToken;
    use lib_types::Address;

    fn addr(id: u8) -> Address {
        Address::new([id; 20])
    }

    /// Ledger controlled by the token at addr(201), token owned by addr(1)
    fn create_test_system(log: &EventLog) -> ManaSystem {
        let mana = PartitionLedger::new(
            addr(200),
            addr(201),
            OperatorRegistry::default(),
            PartitionSet::new(default_partitions()).unwrap(),
        )
        .unwrap();
        let token = UtilityToken::new(addr(201), addr(1), 1_000, addr(200)).unwrap();
        let mut system =
            ManaSystem::from_state(ManaState::new(addr(1), mana, token), Box::new(log.clone()));
        system.transfer(&CallContext::user(addr(1)), addr(2), 100).unwrap();
        log.clear();
        system
    }

    #[test]
    fn test_contribution_event_order() {
        let log = EventLog::new();
        let mut system = create_test_system(&log);

        system
            .contribute_to_cooperative(&CallContext::user(addr(2)), 40)
            .unwrap();

        let events = log.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ManaEvent::Transfer { amount: 40, .. }));
        assert!(matches!(
            events[1],
            ManaEvent::IssuedByPartition { amount: 40, .. }
        ));
        assert!(matches!(
            events[2],
            ManaEvent::ContributedToCooperative { amount: 40, .. }
        ));
        // The mint is issued by the token contract
        assert!(matches!(
            events[1],
            ManaEvent::IssuedByPartition { operator, .. } if operator == addr(201)
        ));
    }

    #[test]
    fn test_zero_contribution_rejected() {
        let log = EventLog::new();
        let mut system = create_test_system(&log);

        let result = system.contribute_to_cooperative(&CallContext::user(addr(2)), 0);
        assert!(matches!(result, Err(ManaError::InvalidAmount(_))));
        assert!(log.is_empty());
    }

    #[test]
    fn test_mismatched_reference_fails_conversion() {
        let log = EventLog::new();
        let mana = PartitionLedger::new(
            addr(200),
            addr(201),
            OperatorRegistry::default(),
            PartitionSet::new(default_partitions()).unwrap(),
        )
        .unwrap();
        // Token points at a different ledger
        let token = UtilityToken::new(addr(201), addr(1), 1_000, addr(199)).unwrap();
        let mut system =
            ManaSystem::from_state(ManaState::new(addr(1), mana, token), Box::new(log.clone()));

        let result = system.contribute_to_cooperative(&CallContext::user(addr(1)), 10);
        assert!(matches!(
            result.unwrap_err().conversion_cause(),
            Some(ManaError::InvalidConfig(_))
        ));
        assert_eq!(system.token().balance_of(&addr(1)), 1_000);
    }

    #[test]
    fn test_purchase_zero_amount() {
        let log = EventLog::new();
        let mut system = create_test_system(&log);

        let result = system.purchase_collateralized_mana(&CallContext::user(addr(1)), 0);
        assert!(matches!(result, Err(ManaError::InvalidAmount(_))));
    }

    #[test]
    fn test_purchase_checks_owner_before_amount() {
        let log = EventLog::new();
        let mut system = create_test_system(&log);

        let result = system.purchase_collateralized_mana(&CallContext::user(addr(2)), 0);
        assert_eq!(result, Err(ManaError::not_owner()));
    }
}
