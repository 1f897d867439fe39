mod common;
use common::*;

use unbed::unbed::VetoReason;

fn single_file(body: &str) -> Workspace {
    let src = format!(
        "package p\n\nimport \"unsafe\"\n\ntype Base struct{{ N int }}\n\nfunc (b *Base) Inc() {{ b.N++ }}\n\ntype Outer struct {{\n\tBase\n\tX int\n}}\n\nvar _ = unsafe.Sizeof(0)\n\n{body}"
    );
    Workspace::new("m", &[("p/p.go", &src)])
}

#[test]
fn method_expression() {
    let ws = single_file("var inc = (*Outer).Inc\n\nfunc f(o *Outer) { o.Inc() }\n");
    let out = ws.run("p.Outer.Base");
    assert_eq!(out.plan.stats.selections, 1);
    assert_eq!(out.plan.vetoes.len(), 1);
    assert!(matches!(out.plan.vetoes[0].reason, VetoReason::MethodExpression { .. }));
    let src = ws.read("p/p.go");
    assert!(src.contains("var inc = (*Outer).Inc\n"));
    assert!(src.contains("o.Base.Inc()"));
}

#[test]
fn method_value_is_rewritten() {
    let ws = single_file("func f(o *Outer) func() { return o.Inc }\n");
    let out = ws.run("p.Outer.Base");
    assert!(out.plan.vetoes.is_empty());
    assert!(ws.read("p/p.go").contains("return o.Base.Inc\n"));
}

#[test]
fn offsetof() {
    let ws = single_file("var o Outer\n\nvar off = unsafe.Offsetof(o.N)\n\nvar size = unsafe.Sizeof(o.N)\n");
    let out = ws.run("p.Outer.Base");
    assert_eq!(out.plan.vetoes.len(), 1);
    assert!(matches!(out.plan.vetoes[0].reason, VetoReason::Offsetof { .. }));
    let src = ws.read("p/p.go");
    assert!(src.contains("unsafe.Offsetof(o.N)"));
    assert!(src.contains("unsafe.Sizeof(o.Base.N)"));
}

#[test]
fn shadowing_field_on_the_explicit_path() {
    let ws = single_file("type Top struct {\n\tOuter\n\tBase string\n}\n\nfunc f(t Top) int { return t.N }\n\nfunc g(o Outer) int { return o.N }\n");
    let out = ws.run("p.Outer.Base");
    assert_eq!(out.plan.vetoes.len(), 1);
    assert_eq!(out.plan.vetoes[0].reason, VetoReason::ShadowedEmbedding { field: "Base".into() });
    let src = ws.read("p/p.go");
    assert!(src.contains("return t.N\n"));
    assert!(src.contains("return o.Base.N\n"));
}

#[test]
fn every_veto_is_reported_with_position() {
    let ws = single_file(
        "var inc = (*Outer).Inc\n\nvar o Outer\n\nvar off = unsafe.Offsetof(o.N)\n\ntype Top struct {\n\tOuter\n\tBase string\n}\n\nvar t Top\n\nvar n = t.N\n",
    );
    let out = ws.run("p.Outer.Base");
    insta::assert_snapshot!(out.diagnostics, @r"
    p/p.go:16:20: not rewriting method expression Inc: an explicit path changes its receiver type
    p/p.go:20:29: not rewriting unsafe.Offsetof argument N: an explicit path changes the offset
    p/p.go:29:11: not rewriting: Base selects a different member from this receiver
    Rewrote 0 selections in 0 files in 0 units.
    ");
}

const LOCKED_OUTER: &str = "package p\n\nimport \"sync\"\n\ntype Base struct{ N int }\n\ntype Outer struct {\n\tBase\n\tsync.Mutex\n}\n\nfunc f(o *Outer) int {\n\to.Lock()\n\treturn o.N\n}\n";

const LOCKED_BASE: &str = "package p\n\nimport \"sync\"\n\ntype Base struct {\n\tN int\n\tsync.Mutex\n}\n\ntype Outer struct{ Base }\n\nfunc f(o *Outer) int {\n\to.Lock()\n\treturn o.N\n}\n";

#[test]
fn external_embedding_beside_the_target() {
    let ws = Workspace::new("m", &[("p/p.go", LOCKED_OUTER)]);
    let out = ws.run("p.Outer.Base");
    assert_eq!(out.plan.stats.selections, 0);
    assert_eq!(out.plan.vetoes.len(), 1);
    assert_eq!(out.plan.vetoes[0].reason, VetoReason::Unresolved { member: "N".into() });
    assert_eq!(ws.read("p/p.go"), LOCKED_OUTER);
    insta::assert_snapshot!(out.diagnostics, @r"
    p/p.go:14:11: not rewriting N: it may select a member of a type from outside the workspace
    Rewrote 0 selections in 0 files in 0 units.
    ");
}

#[test]
fn external_embedding_inside_the_target() {
    let ws = Workspace::new("m", &[("p/p.go", LOCKED_BASE)]);
    let out = ws.run("p.Outer.Base");
    assert_eq!(out.plan.stats.selections, 1);
    assert_eq!(out.plan.vetoes.len(), 1);
    assert_eq!(out.plan.vetoes[0].reason, VetoReason::Unresolved { member: "Lock".into() });
    let src = ws.read("p/p.go");
    assert!(src.contains("\to.Lock()\n\treturn o.Base.N\n"), "{src}");
}

#[test]
fn inserted_name_already_selects_another_member() {
    let ws = single_file(
        "type Other struct{ N int }\n\ntype Top struct {\n\tOuter\n\tB Other\n}\n\nfunc f(t Top) int { return t.N }\n\nfunc g(o Outer) int { return o.N }\n",
    );
    let mut opts = ws.options("p.Outer.Base");
    opts.insert_as = Some("B".into());
    let out = ws.run_with(opts).unwrap();
    assert_eq!(out.plan.stats.selections, 1);
    assert_eq!(out.plan.vetoes.len(), 1);
    assert_eq!(out.plan.vetoes[0].reason, VetoReason::NameTaken { name: "B".into() });
    let src = ws.read("p/p.go");
    assert!(src.contains("func f(t Top) int { return t.N }\n"));
    assert!(src.contains("func g(o Outer) int { return o.B.N }\n"));
}

#[test]
fn unexported_embedding_seen_from_another_package() {
    let ws = Workspace::new(
        "m",
        &[
            ("p/p.go", "package p\n\ntype base struct{ N int }\n\ntype Outer struct{ base }\n\nfunc g(o Outer) int { return o.N }\n"),
            ("q/q.go", "package q\n\nimport \"m/p\"\n\nfunc f(o p.Outer) int { return o.N }\n"),
        ],
    );
    let out = ws.run("p.Outer.base");
    assert_eq!(out.plan.stats.selections, 1);
    assert_eq!(out.plan.vetoes.len(), 1);
    assert_eq!(out.plan.vetoes[0].reason, VetoReason::Inaccessible { field: "base".into() });
    assert!(out.diagnostics.contains("q/q.go:5:34: not rewriting: base is not accessible from this package"), "{}", out.diagnostics);
    assert!(ws.read("p/p.go").contains("return o.base.N"));
    assert!(ws.read("q/q.go").contains("return o.N"));
}
