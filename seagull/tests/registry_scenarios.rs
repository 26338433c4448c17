//! End-to-end registry scenarios against the in-memory hive.

use proptest::prelude::*;
use seagull::registry::{
    Access, CreateOptions, ErrorKind, Hive, Key, MemoryRegistry, RootKey, Value, ValueType,
};

type MemKey = Key<MemoryRegistry>;

#[test]
fn test_name_and_count_scenario() {
    let hive = Hive::new();
    let key = MemKey::created(&hive.root(), "A", Access::default()).unwrap();
    key.set_string_value("name", "seagull").unwrap();
    key.set_dword_value("count", 7).unwrap();

    let mut names = key.enum_value_names().unwrap();
    names.sort();
    assert_eq!(names, vec!["count", "name"]);

    let values = key.enum_values().unwrap();
    let name = values.iter().find(|(n, _)| n == "name").unwrap();
    let count = values.iter().find(|(n, _)| n == "count").unwrap();
    assert_eq!(name.1.string().as_deref(), Some("seagull"));
    assert_eq!(count.1.dword(), Some(7));

    key.delete_value("count").unwrap();
    assert_eq!(key.enum_value_names().unwrap(), vec!["name"]);
}

#[test]
fn test_every_setter_round_trips() {
    let hive = Hive::new();
    let key = MemKey::created(&hive.root(), "Software\\Seagull\\Types", Access::default()).unwrap();
    key.set_dword_value("dword", 0xDEAD_BEEF).unwrap();
    key.set_qword_value("qword", 1 << 40).unwrap();
    key.set_string_value("sz", "hello möwe").unwrap();
    key.set_expanded_string_value("expand", "%USERPROFILE%\\cache").unwrap();
    key.set_multistring_value("multi", &["one", "two", "three"]).unwrap();
    key.set_binary_value("bin", vec![0u8, 1, 2, 255]).unwrap();
    key.set_binary_value("empty", [0u8; 0]).unwrap();

    let values = key.enum_values().unwrap();
    assert_eq!(values.len(), 7);
    let get = |name: &str| &values.iter().find(|(n, _)| n == name).unwrap().1;

    assert_eq!(get("dword").dword(), Some(0xDEAD_BEEF));
    assert_eq!(get("qword").qword(), Some(1 << 40));
    assert_eq!(get("sz").string().as_deref(), Some("hello möwe"));
    assert_eq!(get("expand").ty(), ValueType::ExpandSz);
    assert_eq!(get("expand").string().as_deref(), Some("%USERPROFILE%\\cache"));
    assert_eq!(
        get("multi").multi_string(),
        Some(vec!["one".to_string(), "two".to_string(), "three".to_string()])
    );
    assert_eq!(get("bin").data(), &[0, 1, 2, 255]);
    assert_eq!(get("empty").ty(), ValueType::Binary);
    assert!(get("empty").is_empty());
}

fn read_back(key: &MemKey, name: &str) -> Value {
    key.enum_values()
        .unwrap()
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, value)| value)
        .unwrap()
}

proptest! {
    #[test]
    fn setters_round_trip_any_value(
        dword in any::<u32>(),
        qword in any::<u64>(),
        text in "[^\\x00]{0,64}",
        list in prop::collection::vec("[^\\x00]{1,16}", 0..6),
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let hive = Hive::new();
        let key = MemKey::created(&hive.root(), "Round", Access::default()).unwrap();
        key.set_dword_value("dword", dword).unwrap();
        key.set_qword_value("qword", qword).unwrap();
        key.set_string_value("sz", &text).unwrap();
        key.set_expanded_string_value("expand", &text).unwrap();
        key.set_multistring_value("multi", &list).unwrap();
        key.set_binary_value("bin", &bytes).unwrap();

        prop_assert_eq!(read_back(&key, "dword").dword(), Some(dword));
        prop_assert_eq!(read_back(&key, "qword").qword(), Some(qword));
        prop_assert_eq!(read_back(&key, "sz").string(), Some(text.clone()));
        prop_assert_eq!(read_back(&key, "expand").string(), Some(text));
        prop_assert_eq!(read_back(&key, "multi").multi_string(), Some(list));
        let bin = read_back(&key, "bin");
        prop_assert_eq!(bin.data(), &bytes[..]);
    }
}

#[test]
fn test_names_and_values_agree() {
    let hive = Hive::new();
    let key = MemKey::created(&hive.root(), "Agree", Access::default()).unwrap();
    for i in 0..25u32 {
        key.set_dword_value(&format!("value-{}-{}", i, "x".repeat(i as usize)), i)
            .unwrap();
    }

    let names = key.enum_value_names().unwrap();
    let values = key.enum_values().unwrap();
    assert_eq!(names.len(), 25);
    let value_names: Vec<_> = values.iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(names, value_names);
}

#[test]
fn test_delete_semantics() {
    let hive = Hive::new();
    let root = MemKey::created(&hive.root(), "Tree", Access::default()).unwrap();
    let child = root.create_subkey("Child\\Grandchild", Access::default()).unwrap();
    child.set_dword_value("leaf", 1).unwrap();
    drop(child);

    let err = root.delete_key("Child", Access::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HasChildren);

    root.delete_tree("Child").unwrap();
    let err = MemKey::opened(&hive.root(), "Tree\\Child", Access::READ).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(root.enum_subkeys().unwrap().is_empty());
}

#[test]
fn test_handle_to_deleted_key_reports_not_found() {
    let hive = Hive::new();
    let parent = MemKey::created(&hive.root(), "Gone", Access::default()).unwrap();
    let child = parent.create_subkey("Child", Access::default()).unwrap();
    parent.delete_key("Child", Access::empty()).unwrap();

    let err = child.set_dword_value("x", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_no_handles_leak() {
    let hive = Hive::new();
    {
        let mut key = MemKey::new();
        for _ in 0..10 {
            key.create(&hive.root(), "Leak", Access::default()).unwrap();
        }
        let _sub = key.create_subkey("Sub", Access::default()).unwrap();
        let _listed = key.enum_subkeys().unwrap();
        assert_eq!(hive.open_handles(), 2);
    }
    assert_eq!(hive.open_handles(), 0);
}

#[test]
fn test_roots_are_separate_trees() {
    let hive = Hive::new();
    let machine = hive.predefined(RootKey::LocalMachine);
    MemKey::created(&machine, "Software\\Seagull", Access::default()).unwrap();

    assert!(MemKey::opened(&machine, "SOFTWARE\\SEAGULL", Access::READ).is_ok());
    let err = MemKey::opened(&hive.root(), "Software\\Seagull", Access::READ).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_volatile_subtree() {
    let hive = Hive::new();
    let mut session = MemKey::new();
    session
        .create_with(
            &hive.root(),
            "Session",
            Access::default(),
            CreateOptions::VOLATILE,
            None,
        )
        .unwrap();

    let err = session.create_subkey("Persisted", Access::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut child = MemKey::new();
    child
        .create_with(
            session.get().unwrap(),
            "Scratch",
            Access::default(),
            CreateOptions::VOLATILE,
            None,
        )
        .unwrap();
    assert_eq!(session.enum_subkeys().unwrap(), vec!["Scratch"]);
}

#[test]
fn test_shared_hive_across_threads() {
    let hive = Hive::new();
    MemKey::created(&hive.root(), "Shared", Access::default()).unwrap();

    let workers: Vec<_> = (0..4u32)
        .map(|i| {
            let hive = hive.clone();
            std::thread::spawn(move || {
                let key = MemKey::opened(&hive.root(), "Shared", Access::default()).unwrap();
                key.set_dword_value(&format!("worker{}", i), i).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let key = MemKey::opened(&hive.root(), "Shared", Access::READ).unwrap();
    assert_eq!(key.enum_value_names().unwrap().len(), 4);
    drop(key);
    assert_eq!(hive.open_handles(), 0);
}
