mod common;
use common::*;

fn workspace() -> Workspace {
    Workspace::new(
        "m",
        &[("geom/geom.go", GEOM), ("app/app.go", "package app\n\nimport \"m/geom\"\n\nvar V = geom.NewOuter().N\n")],
    )
}

#[test]
fn rewrites_and_prints_summary() {
    let ws = workspace();
    let output = unbed_bin().arg("-C").arg(ws.path()).arg("geom.Outer.Base").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rewrote 2 selections in 2 files in 2 units."), "{stderr}");
    assert!(output.stdout.is_empty());
    assert!(ws.read("app/app.go").contains("geom.NewOuter().Base.N"));
}

#[test]
fn quoted_container_from_working_directory() {
    let ws = workspace();
    let output = unbed_bin().current_dir(ws.path()).arg("\"m/geom\".Outer.Base").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(ws.read("geom/geom.go").contains("o.Base.N = 2"));
}

#[test]
fn json_plan_on_stdout() {
    let ws = workspace();
    let output = unbed_bin()
        .args(["--json", "--dry-run", "--as", "B", "-C"])
        .arg(ws.path())
        .arg("geom.Outer.Base")
        .output()
        .unwrap();
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["insertion"], "B.");
    assert_eq!(plan["files"].as_array().unwrap().len(), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Would rewrite 2 selections"));
    assert!(ws.read("app/app.go").contains("geom.NewOuter().N\n"));
}

#[test]
fn verbose_logs_progress() {
    let ws = workspace();
    let output = unbed_bin().arg("-v").arg("-C").arg(ws.path()).arg("geom.Outer.Base").output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("(1 matches)"), "{stderr}");
}

#[test]
fn bad_spec_exits_nonzero() {
    let ws = workspace();
    let output = unbed_bin().arg("-C").arg(ws.path()).arg("geom.Outer").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: bad spec expression"), "{stderr}");
}

#[test]
fn resolution_failure_exits_nonzero() {
    let ws = workspace();
    let output = unbed_bin().arg("-C").arg(ws.path()).arg("geom.Outer.X").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("expected immediate embedded field"));
}

#[test]
fn type_error_is_rendered_against_source() {
    let ws = workspace();
    ws.write("app/app.go", "package app\n\nimport \"m/geom\"\n\nvar V = geom.NewOuter().Nope\n");
    let output = unbed_bin().arg("-C").arg(ws.path()).arg("geom.Outer.Base").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("type error in"), "{stderr}");
    assert!(stderr.contains("Nope undefined"), "{stderr}");
}
