//! ManaToken / MANA end-to-end tests
//!
//! Every test starts from the standard deployment sequence: MANA with two
//! operators and the two default partitions, ManaToken with 1,000,000 tokens
//! credited to the deployer, then MANA control handed to ManaToken.

use lib_mana::{
    collateralized, uncollateralized, Address, CallContext, ControllerState, EventLog,
    GenesisConfig, ManaError, ManaEvent, ManaSystem, PartitionId, UNIT,
};

// ============================================================================
// Test helpers
// ============================================================================

fn owner() -> Address {
    Address::new([1u8; 20])
}

fn user1() -> Address {
    Address::new([2u8; 20])
}

fn user2() -> Address {
    Address::new([3u8; 20])
}

fn operators() -> Vec<Address> {
    vec![Address::new([50u8; 20]), Address::new([51u8; 20])]
}

fn deploy() -> (ManaSystem, EventLog) {
    let log = EventLog::new();
    let config = GenesisConfig::new(owner(), operators(), 1_000_000 * UNIT);
    let system = ManaSystem::deploy(&config, Box::new(log.clone())).expect("deployment succeeds");
    (system, log)
}

fn as_user(address: Address) -> CallContext {
    CallContext::user(address)
}

// ============================================================================
// Basic token functionality
// ============================================================================

#[test]
fn test_initial_supply_assigned_to_owner() {
    let (system, _) = deploy();
    assert_eq!(system.token().balance_of(&owner()), 1_000_000 * UNIT);
    assert_eq!(system.token().total_supply(), 1_000_000 * UNIT);
    assert_eq!(system.token().owner(), owner());
}

#[test]
fn test_name_and_symbol() {
    let (system, _) = deploy();
    assert_eq!(system.token().name(), "Uncollateralized Mana");
    assert_eq!(system.token().symbol(), "mana");
}

#[test]
fn test_transfers_between_accounts() {
    let (mut system, _) = deploy();
    system.transfer(&as_user(owner()), user1(), 100 * UNIT).unwrap();
    assert_eq!(system.token().balance_of(&user1()), 100 * UNIT);
}

#[test]
fn test_operators_recorded() {
    let (system, _) = deploy();
    for op in operators() {
        assert!(system.mana().is_operator(&op));
    }
    assert!(!system.mana().is_operator(&owner()));
    assert_eq!(system.mana().partitions().len(), 2);
}

// ============================================================================
// Cooperative contribution
// ============================================================================

#[test]
fn test_contribute_to_cooperative() {
    let (mut system, _) = deploy();
    let amount = 100 * UNIT;
    system.transfer(&as_user(owner()), user1(), amount).unwrap();

    system.contribute_to_cooperative(&as_user(user1()), amount).unwrap();

    // ManaToken was burned
    assert_eq!(system.token().balance_of(&user1()), 0);
    assert_eq!(system.token().total_supply(), 1_000_000 * UNIT - amount);

    // Uncollateralized MANA was minted
    assert_eq!(
        system.mana().balance_of_by_partition(&user1(), &uncollateralized()),
        amount
    );
    assert_eq!(
        system.mana().balance_of_by_partition(&user1(), &collateralized()),
        0
    );
}

#[test]
fn test_contribute_more_than_balance_fails() {
    let (mut system, _) = deploy();
    let amount = 100 * UNIT;
    system.transfer(&as_user(owner()), user1(), amount).unwrap();

    let result = system.contribute_to_cooperative(&as_user(user1()), amount * 2);
    assert_eq!(
        result,
        Err(ManaError::InsufficientBalance {
            have: amount,
            need: amount * 2,
        })
    );
    assert_eq!(system.token().balance_of(&user1()), amount);
    assert_eq!(system.mana().total_supply(), 0);
}

#[test]
fn test_contribution_scenario() {
    let (mut system, _) = deploy();
    system.transfer(&as_user(owner()), user1(), 100).unwrap();

    system.contribute_to_cooperative(&as_user(user1()), 100).unwrap();
    assert_eq!(system.token().balance_of(&user1()), 0);
    assert_eq!(
        system.mana().balance_of_by_partition(&user1(), &uncollateralized()),
        100
    );

    let before = system.state().clone();
    let result = system.contribute_to_cooperative(&as_user(user1()), 1);
    assert!(matches!(result, Err(ManaError::InsufficientBalance { .. })));
    assert_eq!(system.state(), &before);
}

#[test]
fn test_contribution_conserves_caller_value() {
    let (mut system, _) = deploy();
    system.transfer(&as_user(owner()), user1(), 500).unwrap();

    let value = |s: &ManaSystem| s.token().balance_of(&user1()) + s.mana().balance_of(&user1());
    let before = value(&system);

    system.contribute_to_cooperative(&as_user(user1()), 123).unwrap();
    system.contribute_to_cooperative(&as_user(user1()), 77).unwrap();

    assert_eq!(value(&system), before);
    assert_eq!(system.mana().balance_of(&user1()), 200);
    assert_eq!(system.token().total_burned(), 200);
    assert!(system.check_invariants().is_ok());
}

// ============================================================================
// Collateralized MANA purchase
// ============================================================================

#[test]
fn test_owner_purchases_collateralized_mana() {
    let (mut system, _) = deploy();
    let amount = 100 * UNIT;

    system.purchase_collateralized_mana(&as_user(owner()), amount).unwrap();

    assert_eq!(
        system.mana().balance_of_by_partition(&owner(), &collateralized()),
        amount
    );
    // No fungible side effect
    assert_eq!(system.token().balance_of(&owner()), 1_000_000 * UNIT);
    assert_eq!(system.token().total_supply(), 1_000_000 * UNIT);
}

#[test]
fn test_non_owner_cannot_purchase_collateralized_mana() {
    let (mut system, _) = deploy();

    let err = system
        .purchase_collateralized_mana(&as_user(user1()), 100 * UNIT)
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert!(err.to_string().contains("Ownable: caller is not the owner"));
    assert_eq!(system.mana().total_supply(), 0);
}

#[test]
fn test_mana_owned_by_token_contract() {
    let (system, _) = deploy();
    assert_eq!(system.mana().owner(), system.token().address());
    assert_eq!(system.controller_state(), ControllerState::UtilityToken);
}

// ============================================================================
// Integration with the MANA contract
// ============================================================================

#[test]
fn test_mana_contract_reference() {
    let (system, _) = deploy();
    assert_eq!(system.token().mana_governance_token(), system.mana().address());
    assert_ne!(system.mana().address(), system.token().address());
}

#[test]
fn test_deployer_cannot_mint_after_handoff() {
    let (mut system, _) = deploy();

    let result = system.mint_by_partition(&as_user(owner()), collateralized(), owner(), 1);
    assert_eq!(result, Err(ManaError::NotController { caller: owner() }));
}

#[test]
fn test_contribution_emits_events() {
    let (mut system, log) = deploy();
    system.transfer(&as_user(owner()), user1(), 100).unwrap();
    log.clear();

    system.contribute_to_cooperative(&as_user(user1()), 100).unwrap();

    let records = log.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].emitter, system.token().address());
    assert_eq!(
        records[0].event,
        ManaEvent::Transfer {
            from: user1(),
            to: Address::zero(),
            amount: 100,
        }
    );
    assert_eq!(records[1].emitter, system.mana().address());
    assert_eq!(
        records[1].event,
        ManaEvent::IssuedByPartition {
            partition: uncollateralized(),
            operator: system.token().address(),
            to: user1(),
            amount: 100,
        }
    );
}

#[test]
fn test_partition_transfers_after_contribution() {
    let (mut system, _) = deploy();
    system.transfer(&as_user(owner()), user1(), 100).unwrap();
    system.contribute_to_cooperative(&as_user(user1()), 100).unwrap();

    // Holder moves part of its own balance
    system
        .transfer_by_partition(&as_user(user1()), uncollateralized(), user1(), user2(), 30)
        .unwrap();

    // Operator forces a transfer
    system
        .transfer_by_partition(&as_user(operators()[0]), uncollateralized(), user1(), user2(), 20)
        .unwrap();

    // Stranger is rejected
    let result =
        system.transfer_by_partition(&as_user(user2()), uncollateralized(), user1(), user2(), 1);
    assert!(result.unwrap_err().is_unauthorized());

    assert_eq!(system.mana().balance_of(&user1()), 50);
    assert_eq!(system.mana().balance_of(&user2()), 50);
    assert_eq!(system.mana().total_supply_by_partition(&uncollateralized()), 100);
}

#[test]
fn test_unknown_partition_rejected() {
    let (mut system, _) = deploy();
    let unknown = PartitionId::from_label("reserve");

    let result = system.transfer_by_partition(&as_user(user1()), unknown, user1(), user2(), 1);
    assert_eq!(result, Err(ManaError::UnknownPartition(unknown)));
    assert_eq!(system.mana().balance_of_by_partition(&user1(), &unknown), 0);
}

// ============================================================================
// Deployment events and authorization boundary
// ============================================================================

#[test]
fn test_deployment_events_end_with_handoff() {
    let (system, log) = deploy();
    let records = log.records();
    let mana = system.mana().address();
    let token = system.token().address();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].emitter, token);
    assert_eq!(
        records[1].event,
        ManaEvent::Transfer {
            from: Address::zero(),
            to: owner(),
            amount: 1_000_000 * UNIT,
        }
    );
    assert_eq!(records[2].emitter, mana);
    assert_eq!(
        records[2].event,
        ManaEvent::OwnershipTransferred {
            previous: Address::zero(),
            new: owner(),
        }
    );

    // Controller handoff is the last observable step
    assert_eq!(records[3].emitter, mana);
    assert_eq!(
        records[3].event,
        ManaEvent::OwnershipTransferred {
            previous: owner(),
            new: token,
        }
    );
}

#[test]
fn test_operator_transfer_event_records_operator() {
    let (mut system, log) = deploy();
    system.purchase_collateralized_mana(&as_user(owner()), 10).unwrap();
    log.clear();

    let operator = operators()[1];
    system
        .transfer_by_partition(&as_user(operator), collateralized(), owner(), user1(), 4)
        .unwrap();

    assert_eq!(
        log.events(),
        vec![ManaEvent::TransferByPartition {
            partition: collateralized(),
            operator,
            from: owner(),
            to: user1(),
            amount: 4,
        }]
    );
}

#[test]
fn test_token_owner_change_requires_owner() {
    let (mut system, log) = deploy();
    log.clear();
    let before = system.state().clone();

    let err = system
        .transfer_token_ownership(&as_user(user1()), user1())
        .unwrap_err();
    assert!(err.is_unauthorized());
    let err = system.renounce_token_ownership(&as_user(user2())).unwrap_err();
    assert!(err.is_unauthorized());

    assert_eq!(system.state(), &before);
    assert_eq!(system.state().token().owner(), owner());
    assert_eq!(system.state().mana().owner(), system.token().address());
    assert!(log.is_empty());
}
