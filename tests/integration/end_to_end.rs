mod common;
use common::*;

use unbed::Options;

const USE: &str = r#"package app

import (
	"fmt"
	"unsafe"

	"example.com/m/geom"
)

func Show(o geom.Outer) {
	fmt.Println(o.N, o.X)
	fmt.Println(unsafe.Offsetof(o.N))
}

func Bump(o *geom.Outer) int {
	o.Inc()
	return o.Get() + o.Base.N
}
"#;

fn workspace() -> Workspace {
    Workspace::new("example.com/m", &[("geom/geom.go", GEOM), ("app/app.go", USE)])
}

#[test]
fn rewrites_declaring_and_importing_packages() {
    let ws = workspace();
    let out = ws.run("geom.Outer.Base");

    assert_eq!(out.plan.stats.selections, 4);
    assert_eq!(out.plan.stats.files, 2);
    assert_eq!(out.plan.stats.units, 2);

    let geom = ws.read("geom/geom.go");
    assert!(geom.contains("\to.Base.N = 2\n"), "{geom}");
    assert!(geom.contains("func (b *Base) Inc() { b.N++ }"));

    let app = ws.read("app/app.go");
    assert!(app.contains("fmt.Println(o.Base.N, o.X)"), "{app}");
    assert!(app.contains("fmt.Println(unsafe.Offsetof(o.N))"), "{app}");
    assert!(app.contains("\to.Base.Inc()\n\treturn o.Base.Get() + o.Base.N\n"), "{app}");
}

#[test]
fn diagnostics_stream() {
    let ws = workspace();
    let out = ws.run("\"example.com/m/geom\".Outer.Base");
    insta::assert_snapshot!(out.diagnostics, @r"
    app/app.go:12:32: not rewriting unsafe.Offsetof argument N: an explicit path changes the offset
    Rewrote 4 selections in 2 files in 2 units.
    ");
}

#[test]
fn second_run_finds_nothing() {
    let ws = workspace();
    ws.run("geom.Outer.Base");
    let geom = ws.read("geom/geom.go");
    let app = ws.read("app/app.go");

    let again = ws.run("geom.Outer.Base");
    assert_eq!(again.plan.stats.selections, 0);
    assert_eq!(again.plan.vetoes.len(), 1);
    assert_eq!(ws.read("geom/geom.go"), geom);
    assert_eq!(ws.read("app/app.go"), app);
}

#[test]
fn insert_as_names_the_new_field() {
    // The scenario from the un-embedding workflow: `outer.N` becomes `outer.B.N`
    // ahead of renaming the embedding to `B Base`.
    let ws = Workspace::new(
        "m",
        &[(
            "p/p.go",
            "package p\n\ntype Base struct{ N int }\n\ntype Outer struct {\n\tBase\n\tX int\n}\n\nfunc f(outer Outer) int {\n\treturn outer.N + outer.X\n}\n",
        )],
    );
    let opts = Options { insert_as: Some("B".into()), ..ws.options("p.Outer.Base") };
    let out = ws.run_with(opts).unwrap();
    assert_eq!(out.plan.insertion, "B.");
    assert!(ws.read("p/p.go").contains("return outer.B.N + outer.X\n"));
}

#[test]
fn dry_run_reports_without_writing() {
    let ws = workspace();
    let before = ws.read("app/app.go");
    let opts = Options { dry_run: true, ..ws.options("geom.Outer.Base") };
    let out = ws.run_with(opts).unwrap();
    assert_eq!(out.plan.stats.selections, 4);
    assert!(out.diagnostics.ends_with("Would rewrite 4 selections in 2 files in 2 units.\n"));
    assert_eq!(ws.read("app/app.go"), before);
}

#[test]
fn test_files_and_external_test_packages() {
    let ws = workspace();
    ws.write("geom/geom_test.go", "package geom\n\nfunc helper(o Outer) int { return o.N }\n");
    ws.write(
        "geom/x_test.go",
        "package geom_test\n\nimport \"example.com/m/geom\"\n\nvar _ = geom.NewOuter().N\n",
    );
    let out = ws.run("geom.Outer.Base");
    assert_eq!(out.plan.stats.units, 3);
    assert!(ws.read("geom/geom_test.go").contains("return o.Base.N"));
    assert!(ws.read("geom/x_test.go").contains("geom.NewOuter().Base.N"));
}

#[test]
fn manifest_can_skip_tests() {
    let ws = workspace();
    ws.write("unbed.toml", "[workspace]\ntests = false\n");
    ws.write("geom/geom_test.go", "package geom\n\nfunc helper(o Outer) int { return o.N }\n");
    ws.run("geom.Outer.Base");
    assert!(ws.read("geom/geom_test.go").contains("return o.N"));
}

#[test]
fn packages_not_importing_the_target_are_untouched() {
    let ws = workspace();
    let other = "package other\n\ntype Base struct{ N int }\n\ntype Outer struct{ Base }\n\nvar V = Outer{}.N\n";
    ws.write("other/other.go", other);
    let out = ws.run("geom.Outer.Base");
    assert!(out.plan.files.iter().all(|f| f.package != "example.com/m/other"));
    assert_eq!(ws.read("other/other.go"), other);
}

#[test]
fn plan_serializes_as_json() {
    let ws = workspace();
    let opts = Options { dry_run: true, ..ws.options("geom.Outer.Base") };
    let plan = ws.run_with(opts).unwrap().plan;
    let json: serde_json::Value = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["target"]["type_name"], "Outer");
    assert_eq!(json["insertion"], "Base.");
    assert_eq!(json["vetoes"][0]["kind"], "offsetof");
    assert_eq!(json["vetoes"][0]["line"], 12);
    assert_eq!(json["stats"]["units"], 2);
}
