//! Canonical layout of rewritten files.
//!
//! Only whitespace at line ends and at the end of the file is normalized;
//! everything else is left as written.

use std::ops::Range;

use crate::diagnostics::UnbedError;
use crate::lexer::{self, Token};
use crate::parser::parse_file;

/// Check that `source` still parses, strip trailing blanks from each line
/// outside raw string literals, and end the file with a single newline.
pub fn canonicalize(source: &str) -> Result<String, UnbedError> {
    parse_file(source, 0)?;
    let raw: Vec<Range<usize>> = lexer::lex(source, 0)?
        .into_iter()
        .filter(|t| t.node == Token::RawStringLit)
        .map(|t| t.span.start..t.span.end)
        .collect();
    let in_raw = |offset: usize| raw.iter().any(|r| r.start < offset && offset < r.end);

    let mut out = String::with_capacity(source.len());
    let mut line_start = 0;
    for line in source.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let (body, cr) = match body.strip_suffix('\r') {
            Some(b) => (b, "\r"),
            None => (body, ""),
        };
        let line_end = line_start + body.len();
        if in_raw(line_end) {
            out.push_str(line);
        } else {
            out.push_str(body.trim_end_matches([' ', '\t']));
            out.push_str(cr);
            if line.ends_with('\n') {
                out.push('\n');
            }
        }
        line_start += line.len();
    }

    let trimmed = out.trim_end_matches(['\n', '\r']).len();
    out.truncate(trimmed);
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_blanks_and_lines() {
        let src = "package p \n\nvar x = 1\t\n\n\n";
        assert_eq!(canonicalize(src).unwrap(), "package p\n\nvar x = 1\n");
    }

    #[test]
    fn adds_missing_final_newline() {
        assert_eq!(canonicalize("package p").unwrap(), "package p\n");
    }

    #[test]
    fn raw_strings_are_preserved() {
        let src = "package p\n\nvar s = `a  \nb\t\n`   \n";
        assert_eq!(canonicalize(src).unwrap(), "package p\n\nvar s = `a  \nb\t\n`\n");
    }

    #[test]
    fn idempotent() {
        let src = "package p\r\n\r\nfunc f() {  \r\n}\r\n\r\n";
        let once = canonicalize(src).unwrap();
        assert_eq!(once, "package p\r\n\r\nfunc f() {\r\n}\n");
        assert_eq!(canonicalize(&once).unwrap(), once);
    }

    #[test]
    fn unparsable_input_fails() {
        assert!(canonicalize("package p\nvar = \n").is_err());
    }
}
