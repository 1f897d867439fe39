mod common;
use common::*;

use unbed::diagnostics::{ResolveError, UnbedError};

const SHAPES: &str = r#"package shapes

type Point struct{ X, Y int }

type Named struct{ Name string }

type Shape struct {
	Point
	*Named
	Area int
}

type Labeled struct {
	Shape
}

type Celsius float64

type Alias = Shape

func (s Shape) Describe() string { return s.Name }
"#;

fn workspace() -> Workspace {
    Workspace::new("example.com/geo", &[("shapes/shapes.go", SHAPES)])
}

fn resolve_err(ws: &Workspace, spec: &str) -> ResolveError {
    match ws.run_err(spec) {
        UnbedError::Resolve(e) => e,
        other => panic!("{spec}: expected a resolution error, got {other}"),
    }
}

#[test]
fn value_and_pointer_embeddings_resolve() {
    let ws = workspace();
    assert_eq!(ws.run("shapes.Shape.Point").plan.target.field_name, "Point");
    assert_eq!(ws.run("shapes.Shape.Named").plan.target.type_name, "Shape");
}

#[test]
fn alias_of_struct_resolves() {
    let ws = workspace();
    assert_eq!(ws.run("shapes.Alias.Point").plan.stats.selections, 0);
}

#[test]
fn transitively_embedded_field_is_fatal() {
    let ws = workspace();
    let err = resolve_err(&ws, "shapes.Labeled.Point");
    assert_eq!(err.to_string(), "expected immediate embedded field: Labeled.Point is embedded at depth 2");
}

#[test]
fn named_field_is_fatal() {
    let ws = workspace();
    let err = resolve_err(&ws, "shapes.Shape.Area");
    assert!(matches!(err, ResolveError::ExpectedImmediateEmbeddedField { .. }));
}

#[test]
fn method_is_fatal() {
    let ws = workspace();
    let err = resolve_err(&ws, "shapes.Shape.Describe");
    assert_eq!(err.to_string(), "expected immediate embedded field: Shape.Describe is a method");
}

#[test]
fn missing_type_and_non_struct() {
    let ws = workspace();
    assert_eq!(
        resolve_err(&ws, "shapes.Circle.Point"),
        ResolveError::TypeNotFound { package: "example.com/geo/shapes".into(), type_name: "Circle".into() }
    );
    assert_eq!(resolve_err(&ws, "shapes.Celsius.Point"), ResolveError::NotAStruct { type_name: "Celsius".into() });
}

#[test]
fn missing_field() {
    let ws = workspace();
    assert!(matches!(resolve_err(&ws, "shapes.Shape.Z"), ResolveError::FieldNotFound { .. }));
}

#[test]
fn bad_specs_fail_before_loading() {
    let ws = workspace();
    ws.write("broken/broken.go", "package broken\nfunc {\n");
    for spec in ["shapes.Shape", "shapes.Shape.Point.X", "f().Shape.Point"] {
        assert!(matches!(ws.run_err(spec), UnbedError::BadSpec { .. }), "{spec}");
    }
}

#[test]
fn unknown_container() {
    let ws = workspace();
    let err = ws.run_err("\"example.com/other\".T.F");
    assert!(matches!(err, UnbedError::Load { .. }));
    assert!(err.to_string().contains("package example.com/other not found"));
}
