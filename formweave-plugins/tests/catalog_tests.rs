use std::sync::Arc;

use formweave_engine::{AccessPolicy, CatalogBuilder, EngineError, User};
use formweave_plugins::{Builtins, MemoryOutbox, default_catalog, register_builtins};
use formweave_storage::MemoryStore;
use formweave_types::UserId;
use pretty_assertions::assert_eq;

fn builtins() -> Builtins {
    Builtins::new(
        Arc::new(MemoryStore::open_in_memory()),
        Arc::new(MemoryOutbox::new()),
    )
}

#[test]
fn default_catalog_registers_every_builtin() {
    let catalog = default_catalog(&builtins()).unwrap();
    assert_eq!(
        catalog.elements().uids(),
        vec![
            "text", "textarea", "email", "integer", "boolean", "hidden", "select", "slider",
            "file"
        ]
    );
    assert_eq!(catalog.handlers().uids(), vec!["db_store", "mail", "http_repost"]);
    assert_eq!(catalog.wizard_handlers().uids(), vec!["db_store", "mail"]);
    assert!(!catalog.handlers().get("db_store").unwrap().descriptor().allow_multiple);
    assert!(catalog.handlers().get("mail").unwrap().descriptor().allow_multiple);
}

#[test]
fn elements_are_grouped_by_first_registration() {
    let catalog = default_catalog(&builtins()).unwrap();
    let user = User::new(UserId::new());
    let groups = catalog
        .elements()
        .get_for_user(&user, &AccessPolicy::unrestricted());
    let names: Vec<&str> = groups.iter().map(|g| g.group).collect();
    assert_eq!(names, vec!["Text", "Numbers", "Choices", "Other"]);
}

#[test]
fn registering_twice_is_rejected() {
    let builtins = builtins();
    let mut builder = CatalogBuilder::new();
    register_builtins(&mut builder, &builtins).unwrap();
    let err = register_builtins(&mut builder, &builtins).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateUid(uid) if uid == "text"));
}
