mod common;
use common::*;

use unbed::diagnostics::UnbedError;
use unbed::loader::{load, SourceMap};
use unbed::manifest::load_manifest;

#[test]
fn ill_typed_importer_is_fatal() {
    let ws = Workspace::new(
        "m",
        &[("geom/geom.go", GEOM), ("app/app.go", "package app\n\nimport \"m/geom\"\n\nvar v = geom.Outer{}.Missing\n")],
    );
    let err = ws.run_err("geom.Outer.Base");
    let UnbedError::Type { msg, .. } = &err else {
        panic!("expected a type error, got {err}");
    };
    assert!(msg.contains("Missing undefined"), "{msg}");
    // Nothing was written.
    assert!(ws.read("geom/geom.go").contains("\to.N = 2\n"));
}

#[test]
fn syntax_error_points_into_its_file() {
    let ws = Workspace::new("m", &[("geom/geom.go", GEOM), ("app/app.go", "package app\n\nfunc f( {\n")]);
    let mut sources = SourceMap::new();
    let err = load(ws.path(), "m/app", &Default::default(), &mut sources).unwrap_err();
    let (path, _) = unbed::error_location(&err, &sources).expect("syntax errors carry a span");
    assert!(path.ends_with("app/app.go"));
}

#[test]
fn unexported_names_stay_private() {
    let ws = Workspace::new(
        "m",
        &[
            ("a/a.go", "package a\n\ntype inner struct{ n int }\n\ntype T struct{ inner }\n"),
            ("b/b.go", "package b\n\nimport \"m/a\"\n\nvar v = a.T{}.n\n"),
        ],
    );
    let err = ws.run_err("a.T.inner");
    assert!(matches!(err, UnbedError::Type { .. }), "{err}");
}

#[test]
fn excluded_directory_is_never_loaded() {
    let ws = Workspace::new(
        "m",
        &[
            ("geom/geom.go", GEOM),
            ("gen/gen.go", "package gen\n\nimport \"m/geom\"\n\nvar V = geom.Outer{}.N +\n"),
            ("unbed.toml", "[workspace]\nexclude = [\"gen\"]\n"),
        ],
    );
    let out = ws.run("geom.Outer.Base");
    assert_eq!(out.plan.stats.files, 1);
}

#[test]
fn bad_manifest_is_fatal() {
    let ws = Workspace::new("m", &[("geom/geom.go", GEOM), ("unbed.toml", "[workspace]\nexclude = \"gen\"\n")]);
    assert!(matches!(load_manifest(ws.path()), Err(UnbedError::Manifest { .. })));
    assert!(matches!(ws.run_err("geom.Outer.Base"), UnbedError::Manifest { .. }));
}

#[test]
fn nested_module_is_skipped() {
    let ws = Workspace::new(
        "m",
        &[
            ("geom/geom.go", GEOM),
            ("tools/go.mod", "module m/tools\n"),
            ("tools/t.go", "package tools\n\nimport \"m/geom\"\n\nvar V = geom.Outer{}.N\n"),
        ],
    );
    ws.run("geom.Outer.Base");
    assert!(ws.read("tools/t.go").contains("geom.Outer{}.N\n"));
}

#[test]
fn workspace_without_go_mod_uses_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("proj");
    std::fs::create_dir_all(root.join("geom")).unwrap();
    std::fs::write(root.join("geom/geom.go"), GEOM).unwrap();
    let program = load(&root, "geom", &Default::default(), &mut SourceMap::new()).unwrap();
    assert_eq!(program.target, "proj/geom");
}
