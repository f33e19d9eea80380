use serde_json::Value;

/// Result of folding staged bindings into the main list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingDelta {
    pub added: Vec<String>,
    pub dropped: Vec<String>,
}

impl BindingDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }
}

/// Set-union of two identity-keyed lists.
///
/// Main's order is kept and staged entries are appended. A main entry is
/// dropped only when it sits in an owned namespace, was in `seeded` (the
/// owned bindings staging started from) and staging no longer lists it.
/// Anything staging never saw survives.
pub fn union_bindings(
    main: Option<&Value>,
    staging: &[Value],
    owned_prefixes: &[String],
    seeded: &[String],
) -> (Vec<Value>, BindingDelta) {
    let staged: Vec<&str> = staging.iter().filter_map(Value::as_str).collect();
    let mut delta = BindingDelta::default();
    let mut merged: Vec<Value> = Vec::new();

    for entry in main.and_then(Value::as_array).into_iter().flatten() {
        match entry.as_str() {
            Some(identity) => {
                if is_owned(identity, owned_prefixes)
                    && seeded.iter().any(|seed| seed == identity)
                    && !staged.contains(&identity)
                {
                    delta.dropped.push(identity.to_string());
                    continue;
                }
                if !contains_identity(&merged, identity) {
                    merged.push(entry.clone());
                }
            }
            None => merged.push(entry.clone()),
        }
    }

    for identity in staged {
        if push_identity(&mut merged, identity) {
            delta.added.push(identity.to_string());
        }
    }

    (merged, delta)
}

/// Appends `identity` unless already present. Returns whether it was added.
pub fn push_identity(list: &mut Vec<Value>, identity: &str) -> bool {
    if contains_identity(list, identity) {
        return false;
    }
    list.push(Value::String(identity.to_string()));
    true
}

fn contains_identity(list: &[Value], identity: &str) -> bool {
    list.iter().any(|entry| entry.as_str() == Some(identity))
}

pub(crate) fn is_owned(identity: &str, owned_prefixes: &[String]) -> bool {
    owned_prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && identity.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owned() -> Vec<String> {
        vec!["MOD_".to_string()]
    }

    #[test]
    fn unions_without_duplicates() {
        let main = json!(["unit_a", "building_b"]);
        let staging = vec![json!("building_b"), json!("tree_c")];
        let (merged, delta) = union_bindings(Some(&main), &staging, &owned(), &[]);
        assert_eq!(merged, vec![json!("unit_a"), json!("building_b"), json!("tree_c")]);
        assert_eq!(delta.added, vec!["tree_c".to_string()]);
        assert!(delta.dropped.is_empty());
    }

    #[test]
    fn drops_only_seeded_owned_entries_missing_from_staging() {
        let main = json!(["unit_a", "MOD_OLD", "MOD_KEEP"]);
        let staging = vec![json!("MOD_KEEP")];
        let seeded = vec!["MOD_OLD".to_string(), "MOD_KEEP".to_string()];
        let (merged, delta) = union_bindings(Some(&main), &staging, &owned(), &seeded);
        assert_eq!(merged, vec![json!("unit_a"), json!("MOD_KEEP")]);
        assert_eq!(delta.dropped, vec!["MOD_OLD".to_string()]);
    }

    #[test]
    fn owned_entries_staging_never_saw_survive() {
        let main = json!(["unit_a", "MOD_MANUAL"]);
        let staging = vec![json!("unit_a")];
        let (merged, delta) = union_bindings(Some(&main), &staging, &owned(), &[]);
        assert_eq!(merged, vec![json!("unit_a"), json!("MOD_MANUAL")]);
        assert!(delta.is_empty());
    }

    #[test]
    fn absent_main_list_takes_staging() {
        let staging = vec![json!("a"), json!("a"), json!("b")];
        let (merged, _) = union_bindings(None, &staging, &[], &[]);
        assert_eq!(merged, vec![json!("a"), json!("b")]);
    }
}
