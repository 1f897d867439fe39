use crate::span::{LineIndex, Span};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnbedError {
    #[error("bad spec expression: {msg}")]
    BadSpec { msg: String },

    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("Type error: {msg}")]
    Type { msg: String, span: Span },

    #[error("Load error: {msg}")]
    Load { msg: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Format error in '{}': {msg}", path.display())]
    Format { msg: String, path: PathBuf },

    #[error("Manifest error: {msg}")]
    Manifest { msg: String, path: PathBuf },
}

/// Failures to turn a field spec into an immediate embedded field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("type {type_name} not found in package {package}")]
    TypeNotFound { package: String, type_name: String },

    #[error("{type_name} is not a struct type")]
    NotAStruct { type_name: String },

    #[error("{type_name} has no field or method {field}")]
    FieldNotFound { type_name: String, field: String },

    #[error("ambiguous selector {type_name}.{field}")]
    AmbiguousField { type_name: String, field: String },

    #[error("expected immediate embedded field: {type_name}.{field} {reason}")]
    ExpectedImmediateEmbeddedField { type_name: String, field: String, reason: String },
}

impl UnbedError {
    pub fn bad_spec(msg: impl Into<String>) -> Self {
        Self::BadSpec { msg: msg.into() }
    }

    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn type_err(msg: impl Into<String>, span: Span) -> Self {
        Self::Type { msg: msg.into(), span }
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load { msg: msg.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn format(msg: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Format { msg: msg.into(), path: path.into() }
    }

    pub fn manifest(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Manifest { msg: msg.into(), path }
    }

    /// The source span this error points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } | Self::Type { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// `file:line:col: msg` for an error with a span inside `source`.
pub fn format_located(path: &Path, source: &str, span: Span, msg: &str) -> String {
    let (line, col) = LineIndex::new(source).line_col(span.start);
    format!("{}:{line}:{col}: {msg}", path.display())
}

/// Render a spanned UnbedError with ariadne for nice terminal output.
/// Errors without a span fall back to a single `error: ...` line.
pub fn render_error(err: &UnbedError, located: Option<(&Path, &str)>) {
    use ariadne::{Label, Report, ReportKind, Source};

    match (err, located) {
        (UnbedError::Syntax { msg, span } | UnbedError::Type { msg, span }, Some((path, source))) => {
            let kind_str = match err {
                UnbedError::Syntax { .. } => "syntax",
                _ => "type",
            };
            let rendered = Report::build(ReportKind::Error, (), span.start)
                .with_message(format!("{kind_str} error in {}", path.display()))
                .with_label(Label::new(span.start..span.end).with_message(msg))
                .finish()
                .eprint(Source::from(source));
            if rendered.is_err() {
                eprintln!("error: {}", format_located(path, source, *span, msg));
            }
        }
        (UnbedError::Manifest { msg, path }, _) => {
            eprintln!("error[manifest]: {msg}");
            eprintln!("  --> {}", path.display());
        }
        _ => eprintln!("error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_converts_and_displays() {
        let err: UnbedError = ResolveError::NotAStruct { type_name: "Celsius".to_string() }.into();
        assert_eq!(err.to_string(), "Celsius is not a struct type");
        assert!(err.span().is_none());
    }

    #[test]
    fn syntax_error_keeps_span() {
        let err = UnbedError::syntax("unexpected '}'", Span::with_file(4, 5, 2));
        assert_eq!(err.span(), Some(Span::with_file(4, 5, 2)));
        assert_eq!(err.to_string(), "Syntax error: unexpected '}'");
    }

    #[test]
    fn format_located_uses_one_based_positions() {
        let src = "package p\n\nvar x = y\n";
        let span = Span::new(19, 20);
        assert_eq!(
            format_located(Path::new("p/a.go"), src, span, "undefined: y"),
            "p/a.go:3:9: undefined: y"
        );
    }
}
