use civmod::prelude::*;
use civmod::wizard::FINAL_STEP;
use serde_json::{Value, json};

fn loaded(value: Value) -> EditorSession {
    let Value::Object(map) = value else {
        panic!("fixture must be an object")
    };
    let mut session = EditorSession::default();
    session.load(map);
    session
}

fn fill_required_except_mod_id(session: &mut EditorSession) {
    for (path, value) in [
        ("metadata.name", json!("Rome Mod")),
        ("metadata.package", json!("rome")),
        ("action_group.age", json!("AGE_ANTIQUITY")),
        ("civilization.civilization_type", json!("CIVILIZATION_ROME")),
        ("civilization.name", json!("Rome")),
    ] {
        session.set(path, value).unwrap();
    }
    session.append("civilization.traits", json!("TRAIT_ROME")).unwrap();
}

fn walk_to_final_step(session: &mut EditorSession) {
    while session.wizard_state() != WizardState::Step(FINAL_STEP) {
        session.next_step().unwrap();
    }
}

#[test]
fn finish_is_gated_on_mod_id() {
    let mut session = EditorSession::default();
    session.start_wizard().unwrap();
    fill_required_except_mod_id(&mut session);
    walk_to_final_step(&mut session);

    let err = session.finish_wizard().unwrap_err();
    assert_eq!(
        err,
        SessionError::Wizard(WizardError::Incomplete(vec![
            "Mod ID is required".to_string()
        ]))
    );
    assert_eq!(session.wizard_state(), WizardState::Step(FINAL_STEP));
    assert!(session.main().is_empty());

    session.set("metadata.id", json!("rome-mod")).unwrap();
    let report = session.finish_wizard().unwrap();
    assert!(report.changed);
    assert_eq!(session.wizard_state(), WizardState::Merged);
    assert_eq!(session.mode(), EditorMode::Expert);
    assert_eq!(
        session.main().get("metadata.id").unwrap(),
        Some(&json!("rome-mod"))
    );
}

#[test]
fn wizard_preserves_sections_it_does_not_map() {
    let mut session = loaded(json!({
        "metadata": {"id": "rome", "version": "1.0.0"},
        "traditions": [{"id": "TRADITION_A"}]
    }));
    session.start_wizard().unwrap();
    session.set("metadata.name", json!("Rome")).unwrap();
    session.switch_to_expert();
    assert_eq!(
        session.main().to_value(),
        json!({
            "metadata": {"id": "rome", "version": "1.0.0", "name": "Rome"},
            "traditions": [{"id": "TRADITION_A"}]
        })
    );
}

#[test]
fn returning_to_the_wizard_picks_up_expert_edits() {
    let mut session = EditorSession::default();
    session.start_wizard().unwrap();
    session.next_step().unwrap();
    session.set("civilization.name", json!("Rome")).unwrap();
    session.switch_to_expert();

    session.set("civilization.name", json!("Roma")).unwrap();
    session.switch_to_wizard().unwrap();
    assert_eq!(session.wizard_state(), WizardState::Step(2));
    assert_eq!(session.step_view()["civilization_name"], Some(json!("Roma")));
}

#[test]
fn dirty_flag_tracks_edits_and_saves() {
    let mut session = loaded(json!({"metadata": {"id": "rome"}}));
    assert!(!session.is_dirty());

    session.start_wizard().unwrap();
    session.switch_to_expert();
    assert!(!session.is_dirty(), "merging unchanged staging is not an edit");

    session.append("units", json!({"id": "u1"})).unwrap();
    assert!(session.is_dirty());
    session.mark_saved();
    assert!(!session.is_dirty());

    assert!(session.move_up("units", 0).is_err());
    assert!(!session.is_dirty());
}

#[test]
fn coerce_mode_is_opt_in() {
    let options = SessionOptions::default().with_mutation_mode(MutationMode::Coerce);
    let mut session = EditorSession::new(options);
    session.set("civilization", json!("placeholder")).unwrap();
    session.set("civilization.name", json!("Rome")).unwrap();
    assert_eq!(
        session.main().get("civilization").unwrap(),
        Some(&json!({"name": "Rome"}))
    );

    let mut strict = EditorSession::default();
    strict.set("civilization", json!("placeholder")).unwrap();
    assert!(matches!(
        strict.set("civilization.name", json!("Rome")),
        Err(SessionError::Document(DocumentError::TypeConflict { .. }))
    ));
}

#[test]
fn wizard_drops_only_owned_bindings_it_removed() {
    let mut session = loaded(json!({
        "civilization": {"bindings": ["unit_a", "MOD_OLD"]}
    }));
    session.start_wizard().unwrap();
    session.remove_at("civilization.bindings", 1).unwrap();
    session.switch_to_expert();
    assert_eq!(
        session.main().get("civilization.bindings").unwrap(),
        Some(&json!(["unit_a"]))
    );

    session.append("civilization.bindings", json!("MOD_MANUAL")).unwrap();
    session.switch_to_wizard().unwrap();
    session.append("modifiers", json!({"id": "MOD_A"})).unwrap();
    session.switch_to_expert();
    assert_eq!(
        session.main().get("civilization.bindings").unwrap(),
        Some(&json!(["unit_a", "MOD_MANUAL", "MOD_A"]))
    );
}
