//! Role persistence tests
//!
//! These tests verify that roles are stored in the structured shape, that
//! legacy records are normalized on load and that derived values are always
//! recomputed against the current snapshot.

use std::sync::{Arc, MutexGuard, OnceLock};

use permtree::{
    clear_all, count_roles, delete_role, delete_roles, get_meta, get_stored_role, init, list_role_ids,
    load_role, load_roles, save_role, save_roles, test_lock, transact, EngineConfig, Error, ReferenceIssue,
    Role, Selection, SelectionState, Snapshot, StoredRole,
};
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/structure.json");

static DIR: OnceLock<TempDir> = OnceLock::new();

fn setup() -> MutexGuard<'static, ()> {
    let lock = test_lock();
    let dir = DIR.get_or_init(|| TempDir::new().unwrap());
    init(dir.path().to_str().unwrap()).unwrap();
    clear_all().unwrap();
    lock
}

fn snapshot() -> Snapshot {
    Snapshot::from_json(FIXTURE, Arc::new(EngineConfig::default())).unwrap()
}

fn editor(snap: &Snapshot) -> Role {
    let mut role = Role::new("editor", "Editor").with_description("Edits cards");
    let unresolved = role.replace_selection(
        snap,
        &Selection::Structured(SelectionState::from_pairs([("1003", vec!["view", "edit", "delete"]), ("1001", vec!["view"])])),
    );
    assert!(unresolved.is_empty());
    role
}

// ============================================================================
// Setup
// ============================================================================

/// Verify init is idempotent for one path and refuses another
#[test]
fn init_same_path_only() {
    let _lock = setup();
    let dir = DIR.get().unwrap();
    init(dir.path().to_str().unwrap()).unwrap();

    let other = TempDir::new().unwrap();
    let e = init(other.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(e, Error::AlreadyInitialized(_)));
}

// ============================================================================
// Derived values
// ============================================================================

/// Verify power and count follow the selection
#[test]
fn derived_values_follow_selection() {
    let snap = snapshot();
    let mut role = editor(&snap);
    assert_eq!(role.power_level(), 60);
    assert_eq!(role.permission_count(), 4);

    role.replace_selection(&snap, &Selection::Legacy(vec!["8003".into()]));
    assert_eq!(role.power_level(), 90);
    assert_eq!(role.permission_count(), 1);
    assert!(role.selection().is_granted("3001", "admin"));
}

/// Verify templates seed a role and report missing ids
#[test]
fn role_from_template() {
    let snap = snapshot();
    let (role, unresolved) = Role::from_template(&snap, "content_viewer", "viewer").unwrap();
    assert_eq!(role.role_id, "viewer");
    assert_eq!(role.display_name, "Content Viewer");
    assert_eq!(role.template_id.as_deref(), Some("content_viewer"));
    assert_eq!(role.permission_count(), 3);
    assert_eq!(role.power_level(), 10);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].reference, "7001");
    assert!(Role::from_template(&snap, "missing", "x").is_none());
}

// ============================================================================
// Save and load
// ============================================================================

/// Verify a saved role loads back unchanged
#[test]
fn save_and_load() {
    let _lock = setup();
    let snap = snapshot();
    let role = editor(&snap);
    save_role(&role, &snap).unwrap();

    let loaded = load_role("editor", &snap).unwrap().unwrap();
    assert_eq!(loaded.role, role);
    assert!(!loaded.migrated);
    assert!(!loaded.stale);
    assert!(loaded.unresolved.is_empty());

    let stored = get_stored_role("editor").unwrap().unwrap();
    assert!(!stored.is_legacy());
    assert_eq!(stored.structure_version, Some(snap.version()));
    assert!(stored.updated_at > 0);
    assert_eq!(get_meta("structure_version").unwrap(), Some(format!("{:016x}", snap.version())));
}

/// Verify the stored selection uses the structured shape
#[test]
fn stored_shape_is_structured() {
    let _lock = setup();
    let snap = snapshot();
    save_role(&editor(&snap), &snap).unwrap();

    let stored = get_stored_role("editor").unwrap().unwrap();
    let json = serde_json::to_value(&stored).unwrap();
    assert_eq!(json["permission_ids"][0]["permissstruct_id"], "1001");
    assert_eq!(json["permission_ids"][1]["granted_action_key"], serde_json::json!(["delete", "edit", "view"]));
}

/// Verify saving replaces the selection wholesale
#[test]
fn save_replaces_selection() {
    let _lock = setup();
    let snap = snapshot();
    let mut role = editor(&snap);
    save_role(&role, &snap).unwrap();

    role.replace_selection(&snap, &Selection::Legacy(vec!["6001".into()]));
    save_role(&role, &snap).unwrap();

    let loaded = load_role("editor", &snap).unwrap().unwrap();
    assert_eq!(loaded.role.permission_count(), 1);
    assert!(!loaded.role.selection().is_granted("1003", "edit"));
}

/// Verify legacy records are normalized and their derived values recomputed
#[test]
fn legacy_record_migrates_on_load() {
    let _lock = setup();
    let snap = snapshot();
    let stored: StoredRole = serde_json::from_str(
        r#"{"role_id":"old","display_name":"Old Role","permission_ids":[5001,"5009",7001],"power_level":5,"permission_count":9}"#,
    )
    .unwrap();
    assert!(stored.is_legacy());
    transact(|tx| tx.put_role(&stored)).unwrap();

    let loaded = load_role("old", &snap).unwrap().unwrap();
    assert!(loaded.migrated);
    assert!(!loaded.stale);
    assert_eq!(loaded.unresolved.len(), 1);
    assert_eq!(loaded.unresolved[0].issue, ReferenceIssue::UnknownPermission);
    assert_eq!(loaded.role.power_level(), 60);
    assert_eq!(loaded.role.permission_count(), 2);

    save_role(&loaded.role, &snap).unwrap();
    let again = load_role("old", &snap).unwrap().unwrap();
    assert!(!again.migrated);
    assert_eq!(again.role, loaded.role);
}

/// Verify records saved against another structure are flagged and clipped
#[test]
fn stale_record_is_clipped() {
    let _lock = setup();
    let snap = snapshot();
    let stored: StoredRole = serde_json::from_str(
        r#"{"role_id":"s","display_name":"Stale","structure_version":1,
            "permission_ids":[{"permissstruct_id":"1003","granted_action_key":["view","archive"]},
                              {"permissstruct_id":"7777","granted_action_key":["view"]}]}"#,
    )
    .unwrap();
    transact(|tx| tx.put_role(&stored)).unwrap();

    let loaded = load_role("s", &snap).unwrap().unwrap();
    assert!(loaded.stale);
    assert!(!loaded.migrated);
    assert_eq!(loaded.unresolved.len(), 2);
    assert_eq!(loaded.role.permission_count(), 1);
}

/// Verify reads inside a transaction see its writes
#[test]
fn transaction_reads_own_writes() {
    let _lock = setup();
    let snap = snapshot();
    let stored = editor(&snap).to_stored(snap.version(), 1);
    let got = transact(|tx| {
        tx.put_role(&stored)?;
        tx.set_meta("note", "batch")?;
        Ok((tx.get_role("editor")?, tx.get_meta("note")?))
    })
    .unwrap();
    assert_eq!(got.0, Some(stored));
    assert_eq!(got.1.as_deref(), Some("batch"));
}

// ============================================================================
// Listing and deletion
// ============================================================================

#[test]
fn list_and_count() {
    let _lock = setup();
    let snap = snapshot();
    let roles = vec![editor(&snap), Role::new("auditor", "Auditor"), Role::new("zeta", "Zeta")];
    save_roles(&roles, &snap).unwrap();

    assert_eq!(count_roles().unwrap(), 3);
    assert_eq!(list_role_ids().unwrap(), vec!["auditor", "editor", "zeta"]);
    let loaded = load_roles(&snap).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[1].role.role_id, "editor");
}

#[test]
fn delete_removes_role() {
    let _lock = setup();
    let snap = snapshot();
    save_role(&editor(&snap), &snap).unwrap();

    assert!(delete_role("editor").unwrap());
    assert!(!delete_role("editor").unwrap());
    assert!(load_role("editor", &snap).unwrap().is_none());
    assert_eq!(count_roles().unwrap(), 0);
}

#[test]
fn delete_many() {
    let _lock = setup();
    let snap = snapshot();
    save_roles(&[Role::new("a", "A"), Role::new("b", "B")], &snap).unwrap();
    assert_eq!(delete_roles(&["a", "b", "c"]).unwrap(), 2);
    assert!(list_role_ids().unwrap().is_empty());
}
