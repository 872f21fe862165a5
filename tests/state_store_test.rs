//! Baseline store properties

use portwatch::{PortRange, PortSet, StateStore, Target};
use proptest::collection::btree_set;
use proptest::prelude::*;
use std::fs;

fn target() -> Target {
    Target::new("example.com", PortRange::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_saved_set_loads_back_exactly(ports in btree_set(1u16..=65535, 0..128)) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();

        store.save(&target(), &ports).unwrap();
        prop_assert_eq!(store.load(&target()), ports);
    }

    #[test]
    fn prop_injected_garbage_is_ignored(
        ports in btree_set(1u16..=65535, 1..32),
        garbage in proptest::collection::vec("[a-z ]{1,8}|0|65536|-[0-9]{1,3}", 1..8),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path()).unwrap();
        store.save(&target(), &ports).unwrap();

        let path = store.record_path(&target());
        let mut content = fs::read_to_string(&path).unwrap();
        for line in &garbage {
            content.push_str(line);
            content.push('\n');
        }
        // Duplicates of real entries must not create duplicate members
        let first = *ports.iter().next().unwrap();
        content.push_str(&format!("{}\n", first));
        fs::write(&path, content).unwrap();

        prop_assert_eq!(store.load(&target()), ports);
    }
}

#[test]
fn test_unknown_target_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path()).unwrap();
    let fresh = Target::new("never-seen.test", PortRange::default()).unwrap();
    assert_eq!(store.load(&fresh), PortSet::new());
}

#[test]
fn test_store_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = StateStore::new(&nested).unwrap();
    store.save(&target(), &[80u16].into_iter().collect()).unwrap();
    assert!(nested.join("example_com_ports.txt").exists());
}
