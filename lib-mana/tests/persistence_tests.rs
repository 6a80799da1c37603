//! Save and restore of the two-ledger state

use lib_mana::{
    uncollateralized, Address, CallContext, EventLog, FileStore, GenesisConfig, ManaError,
    ManaSystem, MemoryStore, NullSink, StateStore, UNIT,
};

fn owner() -> Address {
    Address::new([1u8; 20])
}

fn holder() -> Address {
    Address::new([2u8; 20])
}

fn active_system() -> ManaSystem {
    let config = GenesisConfig::new(owner(), vec![Address::new([50u8; 20])], 1_000 * UNIT);
    let mut system = ManaSystem::deploy(&config, Box::new(NullSink)).unwrap();
    system
        .transfer(&CallContext::user(owner()), holder(), 10 * UNIT)
        .unwrap();
    system
        .contribute_to_cooperative(&CallContext::user(holder()), 4 * UNIT)
        .unwrap();
    system
        .purchase_collateralized_mana(&CallContext::user(owner()), UNIT)
        .unwrap();
    system
}

#[test]
fn test_memory_store_roundtrip() {
    let system = active_system();
    let store = MemoryStore::new();
    system.save(&store).unwrap();

    let restored = ManaSystem::restore(&store, Box::new(NullSink)).unwrap();
    assert_eq!(restored.state(), system.state());
    assert_eq!(restored.state_root().unwrap(), system.state_root().unwrap());
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let system = active_system();
    {
        let store = FileStore::open(dir.path()).unwrap();
        system.save(&store).unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    let mut restored = ManaSystem::restore(&store, Box::new(NullSink)).unwrap();
    assert_eq!(restored.state_root().unwrap(), system.state_root().unwrap());
    assert_eq!(
        restored.mana().balance_of_by_partition(&holder(), &uncollateralized()),
        4 * UNIT
    );

    // The restored system keeps operating with the same controller
    assert!(restored.is_handoff_complete());
    restored
        .contribute_to_cooperative(&CallContext::user(holder()), UNIT)
        .unwrap();
    assert_eq!(restored.token().balance_of(&holder()), 5 * UNIT);
}

#[test]
fn test_restore_publishes_no_events() {
    let system = active_system();
    let store = MemoryStore::new();
    system.save(&store).unwrap();

    let log = EventLog::new();
    let _restored = ManaSystem::restore(&store, Box::new(log.clone())).unwrap();
    assert!(log.is_empty());
}

#[test]
fn test_corrupt_record_rejected() {
    let store = MemoryStore::new();
    store.set(lib_mana::store::STATE_KEY, b"not a state").unwrap();

    let result = ManaSystem::restore(&store, Box::new(NullSink));
    assert!(matches!(result, Err(ManaError::Storage(_))));
}
