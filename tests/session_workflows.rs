use scenetree::CommandShell;
use scenetree_core::{
    Config, NodeClass, NodeKind, NodePath, RenameOutcome, SceneError, Session, Snapshot, Tree,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn bare_session() -> Session {
    Session::new(Config {
        seed_samples: false,
        ..Config::default()
    })
}

fn path(raw: &str) -> NodePath {
    NodePath::parse(raw).expect("path")
}

#[test]
fn undo_redo_of_add_restores_structurally_equal_tree() {
    let mut session = bare_session();
    session
        .add_child(&path("Workspace"), NodeClass::Model)
        .expect("add");
    let after_add = session.tree().clone();

    session.undo().expect("undo");
    session.redo().expect("redo");
    assert_eq!(session.tree(), &after_add);
}

#[test]
fn n_undos_then_n_redos_reproduce_final_tree() {
    let mut session = bare_session();
    let folder = session
        .add_named(&path("ReplicatedStorage"), "Assets", NodeClass::Folder)
        .expect("folder");
    let part = session.add_child(&folder, NodeClass::Part).expect("part");
    session.rename(&part, "Crate").expect("rename");
    session
        .add_child(&path("ServerScriptService"), NodeClass::Script)
        .expect("script");
    session.delete(&folder.child("Crate")).expect("delete");
    let final_tree = session.tree().clone();
    let recorded = session.history().len();
    assert_eq!(recorded, 5);

    for _ in 0..recorded {
        assert!(session.undo().expect("undo"));
    }
    assert_eq!(session.tree(), &Tree::default());
    for _ in 0..recorded {
        assert!(session.redo().expect("redo"));
    }
    assert_eq!(session.tree(), &final_tree);
}

#[test]
fn add_to_service_list_undo_redo_scenario() {
    let mut session = bare_session();
    let service = path("ReplicatedStorage");
    let x = session
        .add_named(&service, "X", NodeClass::Script)
        .expect("add X");
    let serialized = serde_json::to_string(session.tree().resolve(&x).expect("X")).expect("json");

    let names = |session: &Session| -> Vec<String> {
        session
            .list_children(&service)
            .expect("list")
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    };
    assert_eq!(names(&session), ["X"]);

    session.undo().expect("undo");
    assert!(names(&session).is_empty());

    session.redo().expect("redo");
    assert_eq!(names(&session), ["X"]);
    assert_eq!(
        serde_json::to_string(session.tree().resolve(&x).expect("X")).expect("json"),
        serialized
    );
}

#[test]
fn duplicate_sibling_name_is_rejected_without_change() {
    let mut session = bare_session();
    session
        .add_named(&path("Workspace"), "Part1", NodeClass::Part)
        .expect("first");
    let before = session.tree().clone();

    assert!(matches!(
        session.add_named(&path("Workspace"), "Part1", NodeClass::Part),
        Err(SceneError::NameCollision { .. })
    ));
    assert_eq!(session.tree(), &before);
    assert_eq!(session.history().len(), 1);
}

#[test]
fn same_name_rename_is_not_recorded() {
    let mut session = bare_session();
    let part = session
        .add_named(&path("Workspace"), "Part1", NodeClass::Part)
        .expect("part");
    assert_eq!(
        session.rename(&part, "Part1").expect("rename"),
        RenameOutcome::Unchanged(part)
    );
    assert_eq!(session.history().len(), 1);
}

#[test]
fn script_buffer_follows_rename_and_back() {
    let mut session = bare_session();
    let main = session
        .add_named(&path("ServerScriptService"), "Main", NodeClass::Script)
        .expect("script");
    session.open_script(&main).expect("open");
    session.set_script_text(&main, "draft text").expect("edit");

    session.rename(&main, "Boot").expect("rename");
    let active = session.active_buffer().expect("active");
    assert_eq!(active.path(), &path("ServerScriptService.Boot"));
    assert_eq!(active.display_name(), "Boot");
    assert_eq!(active.text(), "draft text");

    session
        .rename(&path("ServerScriptService.Boot"), "Main")
        .expect("rename back");
    let active = session.active_buffer().expect("active");
    assert_eq!(active.path(), &main);
    assert_eq!(active.display_name(), "Main");
}

#[test]
fn deleted_script_restores_pre_delete_source_on_undo() {
    let mut session = bare_session();
    let main = session
        .add_named(&path("ServerScriptService"), "Main", NodeClass::Script)
        .expect("script");
    session.open_script(&main).expect("open");
    session.set_script_text(&main, "never flushed").expect("edit");

    session.delete(&main).expect("delete");
    assert!(session.buffers().is_empty());

    session.undo().expect("undo");
    assert_eq!(
        session.tree().resolve(&main).expect("main").kind,
        NodeKind::Script {
            source: "-- Hello from Main".to_string()
        }
    );
}

#[test]
fn shell_import_replaces_tree_from_file() {
    let mut source = bare_session();
    source
        .add_named(&path("Workspace"), "Baseplate", NodeClass::Part)
        .expect("part");
    let exported = source
        .export_snapshot()
        .to_json_pretty()
        .expect("export");

    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(exported.as_bytes()).expect("write snapshot");

    let mut shell = CommandShell::new(bare_session(), false);
    shell.run_line("add Workspace Folder").expect("add");
    let line = format!("import \"{}\"", file.path().display());
    shell.run_line(&line).expect("import");

    let session = shell.session();
    assert!(session.tree().contains(&path("Workspace.Baseplate")));
    assert!(!session.tree().contains(&path("Workspace.Folder1")));
    assert!(session.history().is_empty());
    assert_eq!(
        Snapshot::from_json(&exported).expect("parse").tree(),
        session.tree()
    );
}

#[test]
fn shell_import_rejects_invalid_snapshot() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(br#"{"name":"game","kind":{"class":"Part"}}"#)
        .expect("write snapshot");

    let mut shell = CommandShell::new(bare_session(), false);
    let line = format!("import \"{}\"", file.path().display());
    assert!(shell.run_line(&line).is_err());
    assert!(shell.session().tree().contains(&path("Workspace")));
}

#[test]
fn shell_rename_flow_end_to_end() {
    let mut shell = CommandShell::new(bare_session(), false);
    let script = "\
# build a level
add Workspace Model Level
select Workspace.Level
select Workspace.Level
draft \"Level 2\"
commit
status
undo
";
    let mut out = Vec::new();
    let mut err = Vec::new();
    let failures = shell
        .run_lines(script.as_bytes(), &mut out, &mut err)
        .expect("io");
    assert_eq!(failures, 0, "stderr: {}", String::from_utf8_lossy(&err));

    let out = String::from_utf8(out).expect("utf8");
    assert!(out.contains("renaming game.Workspace.Level -> Level"));
    assert!(out.contains("Renamed to game.Workspace.Level_2"));
    assert!(out.contains("selection: selected game.Workspace.Level_2"));
    assert!(out.contains("Undid rename game.Workspace.Level 'Level' -> 'Level_2'"));
    assert_eq!(
        shell.session().current_selection(),
        Some(&path("Workspace.Level"))
    );
}
