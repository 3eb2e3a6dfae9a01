use std::rc::Rc;

use canopy_db::{FileId, QueryDb};
use canopy_sema::{HostTypeProvider, StaticHostTypeProvider};

/// Builds a `QueryDb` with one file's three inputs set from a source string,
/// a context type name, and a host fixture given as JSON (the same shape
/// `canopy-cli`'s `--context-type-json` flag reads).
pub(crate) fn db_for(source: &str, context_type: &str, host_json: &str) -> (QueryDb, FileId) {
    let host = StaticHostTypeProvider::from_json(host_json).expect("fixture JSON must deserialize");
    let mut db = QueryDb::new();
    let file = FileId::new("test://scenario.bt");
    db.set_source_text(file.clone(), Rc::<str>::from(source));
    db.set_context_type(file.clone(), Rc::<str>::from(context_type));
    db.set_roslyn_compilation(file.clone(), host as Rc<dyn HostTypeProvider>);
    (db, file)
}

/// Fixture for spec.md §8 scenario 1 (minimal) and scenario 2 (missing
/// member): an `Npc` context type with a `Health` member and two
/// zero-argument action methods.
pub(crate) const NPC_FIXTURE: &str = r#"{
    "Npc": {
        "members": [
            { "name": "Health", "type": "float" }
        ],
        "methods": [
            { "name": "Flee", "return": "Status" },
            { "name": "Patrol", "return": "Status" }
        ]
    }
}"#;

/// Fixture for spec.md §8 scenario 6 (nullable narrowing): a `Target`
/// member of nullable host type `Enemy`, and an `Attack` method taking one
/// `Enemy` argument.
pub(crate) const TARGET_FIXTURE: &str = r#"{
    "Npc": {
        "members": [
            { "name": "Target", "type": "Enemy", "nullable": true }
        ],
        "methods": [
            { "name": "Attack", "params": ["Enemy"], "return": "Status" }
        ]
    }
}"#;
