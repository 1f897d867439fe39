//! Parsing of the `Container.Type.Field` argument.

use serde::Serialize;

use crate::diagnostics::UnbedError;
use crate::parser::ast::ExprKind;
use crate::parser::parse_expr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Import path of the package declaring the type.
    pub container: String,
    pub type_name: String,
    /// Name of the embedded field to make explicit.
    pub field_name: String,
}

impl std::fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}.{}.{}", self.container, self.type_name, self.field_name)
    }
}

/// Parse `pkg.Type.Field` or `"path/to/pkg".Type.Field` as an expression:
/// two selectors on top of an identifier or string literal.
pub fn parse_field_spec(input: &str) -> Result<FieldSpec, UnbedError> {
    let bad = || UnbedError::bad_spec(format!("invalid field spec {input:?}: want Container.Type.Field"));

    let expr = parse_expr(input).map_err(|_| bad())?;
    let ExprKind::Selector { object, field } = expr.node.kind else {
        return Err(bad());
    };
    let ExprKind::Selector { object: container, field: type_name } = object.node.kind else {
        return Err(bad());
    };
    let container = match container.node.kind {
        ExprKind::Ident(name) => name,
        ExprKind::StringLit(path) => path,
        _ => return Err(bad()),
    };
    if container.is_empty() {
        return Err(bad());
    }

    Ok(FieldSpec { container, type_name: type_name.node, field_name: field.node })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_container() {
        let spec = parse_field_spec("geom.Outer.Base").unwrap();
        assert_eq!(spec.container, "geom");
        assert_eq!(spec.type_name, "Outer");
        assert_eq!(spec.field_name, "Base");
    }

    #[test]
    fn quoted_container_is_unquoted() {
        let spec = parse_field_spec(r#""example.com/m/geom".Outer.Base"#).unwrap();
        assert_eq!(spec.container, "example.com/m/geom");

        let spec = parse_field_spec(r#""a\x2fb".T.F"#).unwrap();
        assert_eq!(spec.container, "a/b");

        let spec = parse_field_spec("`raw/path`.T.F").unwrap();
        assert_eq!(spec.container, "raw/path");
    }

    #[test]
    fn display_quotes_container() {
        let spec = parse_field_spec("p.T.F").unwrap();
        assert_eq!(spec.to_string(), "\"p\".T.F");
    }

    #[test]
    fn other_shapes_are_bad_specs() {
        for input in [
            "",
            "T.F",
            "a.b.c.d",
            "p.T.F()",
            "p.T[0].F",
            "1.T.F",
            "(p).T.F(",
            "\"\".T.F",
            "p.T.F extra",
            "f().T.F",
        ] {
            let err = parse_field_spec(input).unwrap_err();
            assert!(matches!(err, UnbedError::BadSpec { .. }), "{input:?}: {err:?}");
        }
    }
}
