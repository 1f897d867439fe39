// Property tests for the front end:
// 1. No panics: lexing, parsing and field spec parsing reject bad input with errors
// 2. Field specs: every well-formed spec parses back to its parts
// 3. Formatting: canonicalize is idempotent on programs that parse

use proptest::prelude::*;
use unbed::field_spec::parse_field_spec;
use unbed::format::canonicalize;
use unbed::lexer::lex;
use unbed::parser::parse_file;

fn ident() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,8}".prop_filter("keywords are not identifiers", |s| {
        !matches!(
            s.as_str(),
            "break" | "case" | "chan" | "const" | "continue" | "default" | "defer" | "else" | "fallthrough" | "for"
                | "func" | "go" | "goto" | "if" | "import" | "interface" | "map" | "package" | "range" | "return"
                | "select" | "struct" | "switch" | "type" | "var"
        )
    })
}

fn arb_program() -> impl Strategy<Value = String> {
    (ident(), ident(), ident(), 0..100i64, "[ \t]{0,3}", 0..4usize).prop_map(|(ty, field, var, n, pad, blank)| {
        format!(
            "package p{pad}\n\ntype {ty} struct {{{pad}\n\t{field} int\n}}\n\nvar {var} = {ty}{{{field}: {n}}}.{field}{pad}\n{}",
            "\n".repeat(blank)
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn front_end_never_panics(source in "\\PC{0,300}") {
        let _ = lex(&source, 0);
        let _ = parse_file(&source, 0);
        let _ = parse_field_spec(&source);
    }

    #[test]
    fn well_formed_specs_parse(pkg in ident(), ty in ident(), field in ident()) {
        let spec = parse_field_spec(&format!("{pkg}.{ty}.{field}")).unwrap();
        prop_assert_eq!(spec.container, pkg);
        prop_assert_eq!(spec.type_name, ty);
        prop_assert_eq!(spec.field_name, field);
    }

    #[test]
    fn quoted_paths_parse(path in "[a-z]{1,6}(\\.[a-z]{2,3})?(/[a-z0-9_]{1,6}){0,3}", ty in ident(), field in ident()) {
        let spec = parse_field_spec(&format!("{path:?}.{ty}.{field}")).unwrap();
        prop_assert_eq!(spec.container, path);
    }

    #[test]
    fn canonicalize_is_idempotent(source in arb_program()) {
        let once = canonicalize(&source).unwrap();
        prop_assert_eq!(canonicalize(&once).unwrap(), once.clone());
        prop_assert!(once.ends_with('\n') && !once.ends_with("\n\n"));
    }
}
