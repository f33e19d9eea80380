use civmod::{CrossRefs, DirtyTracker, Document, DocumentError};
use serde_json::{Value, json};

fn doc(value: Value) -> Document {
    let Value::Object(map) = value else {
        panic!("fixture must be an object")
    };
    Document::from_map(map, DirtyTracker::new())
}

fn prerequisites(document: &Document) -> Vec<Value> {
    let Some(Value::Array(nodes)) = document.get("progression_tree_nodes").unwrap() else {
        panic!("nodes missing")
    };
    nodes
        .iter()
        .map(|node| node.get("prerequisites").cloned().unwrap_or(Value::Null))
        .collect()
}

#[test]
fn set_then_get_returns_the_written_value() {
    let mut document = Document::default();
    for (path, value) in [
        ("metadata.id", json!("rome")),
        ("civilization.traits.0", json!("TRAIT_A")),
        ("units.0.stats.0.value", json!(12)),
        ("metadata.description", Value::Null),
    ] {
        document.set(path, value.clone()).unwrap();
        assert_eq!(document.get(path).unwrap(), Some(&value), "{path}");
    }
}

#[test]
fn append_lands_at_previous_length() {
    let mut document = doc(json!({"units": [{"id": "u1"}, {"id": "u2"}]}));
    let before = document.list_len("units").unwrap();
    let index = document.append("units", json!({"id": "u3"})).unwrap();
    assert_eq!(index, before);
    assert_eq!(
        document.get(format!("units.{before}").as_str()).unwrap(),
        Some(&json!({"id": "u3"}))
    );
}

#[test]
fn remove_at_shifts_later_elements_down() {
    let mut document = doc(json!({"tags": ["a", "b", "c", "d"]}));
    let removed = document.remove_at("tags", 1).unwrap();
    assert_eq!(removed, json!("b"));
    assert_eq!(document.get("tags").unwrap(), Some(&json!(["a", "c", "d"])));
    assert!(matches!(
        document.remove_at("tags", 3),
        Err(DocumentError::IndexOutOfRange { index: 3, len: 3, .. })
    ));
}

#[test]
fn move_up_then_down_restores_order_and_references() {
    let original = json!({"progression_tree_nodes": [
        {"id": "n0"},
        {"id": "n1", "prerequisites": [0]},
        {"id": "n2", "prerequisites": [0, 1]},
        {"id": "n3", "prerequisites": [2]}
    ]});
    let mut document = doc(original.clone());

    document.move_up("progression_tree_nodes", 2).unwrap();
    assert_eq!(
        prerequisites(&document),
        vec![Value::Null, json!([0, 2]), json!([0]), json!([1])]
    );

    document.move_down("progression_tree_nodes", 1).unwrap();
    assert_eq!(document.to_value(), original);
}

#[test]
fn unregistered_lists_move_without_rewriting() {
    let mut document = doc(json!({"units": [{"id": "a", "prerequisites": [1]}, {"id": "b"}]}))
        .with_cross_refs(CrossRefs::empty());
    document.move_down("units", 0).unwrap();
    assert_eq!(
        document.get("units").unwrap(),
        Some(&json!([{"id": "b"}, {"id": "a", "prerequisites": [1]}]))
    );
}

#[test]
fn failed_operations_leave_the_document_untouched() {
    let tracker = DirtyTracker::new();
    let Value::Object(map) = json!({"metadata": "flat", "units": [{"id": "u1"}]}) else {
        unreachable!()
    };
    let mut document = Document::from_map(map, tracker.clone());
    let before = document.to_value();

    assert!(document.set("metadata.id", json!("m")).is_err());
    assert!(document.set("units.5.id", json!("x")).is_err());
    assert!(document.move_down("units", 0).is_err());
    assert!(document.move_up("units", 0).is_err());
    assert!(matches!(
        document.set("units..id", json!("x")),
        Err(DocumentError::InvalidPath { .. })
    ));

    assert_eq!(document.to_value(), before);
    assert!(!tracker.is_dirty());
}
