pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod visit;
pub mod typeck;
pub mod manifest;
pub mod loader;
pub mod field_spec;
pub mod resolve;
pub mod unbed;
pub mod format;
pub mod editor;
pub mod report;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use diagnostics::UnbedError;
use loader::SourceMap;
use report::{Reporter, Stats};
use resolve::TargetSummary;
use span::LineIndex;
use unbed::VetoReason;

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Workspace root.
    pub root: PathBuf,
    /// `Container.Type.Field`
    pub spec: String,
    /// Identifier inserted instead of the embedded field's name.
    pub insert_as: Option<String>,
    pub dry_run: bool,
}

/// Everything a run did or, with `dry_run`, would do.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub target: TargetSummary,
    /// Text inserted at every offset.
    pub insertion: String,
    pub files: Vec<PlannedFile>,
    pub vetoes: Vec<PlannedVeto>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    /// Relative to the workspace root.
    pub path: PathBuf,
    pub package: String,
    /// Byte offsets into the original file, ascending.
    pub offsets: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedVeto {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    #[serde(flatten)]
    pub reason: VetoReason,
}

/// Parse the field spec, load the affected packages, and rewrite every
/// implicit selection through the target field. Vetoes and the summary go
/// to `reporter`; sources read along the way are kept in `sources`.
pub fn run<W: Write>(opts: &Options, sources: &mut SourceMap, reporter: &mut Reporter<W>) -> Result<Plan, UnbedError> {
    let spec = field_spec::parse_field_spec(&opts.spec)?;
    let manifest = manifest::load_manifest(&opts.root)?;
    let program = loader::load(&opts.root, &spec.container, &manifest, sources)?;
    let target = resolve::resolve_target(&program, &spec, opts.insert_as.as_deref())?;
    info!(package = %target.package, "unembedding {}.{}", target.type_name, target.field_name);

    let insertion = target.insertion();
    let mut plan = Plan {
        target: TargetSummary::from(&target),
        insertion: insertion.clone(),
        files: Vec::new(),
        vetoes: Vec::new(),
        stats: Stats::default(),
    };

    for unit in unbed::find_matches(&program, &target) {
        for file in &unit.files {
            let shown = display_path(&opts.root, &file.path);
            if !file.vetoes.is_empty() {
                let (_, source) = sources
                    .get_source(file.file_id)
                    .ok_or_else(|| UnbedError::load(format!("no source for {}", file.path.display())))?;
                let index = LineIndex::new(source);
                for veto in &file.vetoes {
                    reporter.veto(&shown, source, veto)?;
                    let (line, column) = index.line_col(veto.span.start);
                    plan.vetoes.push(PlannedVeto { path: shown.clone(), line, column, reason: veto.reason.clone() });
                }
            }
            if file.offsets.is_empty() {
                continue;
            }
            editor::rewrite_file(&file.path, &file.offsets, &insertion, opts.dry_run)?;
            reporter.rewrote(&unit.path, file.offsets.len());
            plan.files.push(PlannedFile { path: shown, package: unit.path.clone(), offsets: file.offsets.clone() });
        }
    }

    reporter.summary(opts.dry_run)?;
    plan.stats = reporter.stats();
    Ok(plan)
}

fn display_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// The file and source text a spanned error points into.
pub fn error_location<'a>(err: &UnbedError, sources: &'a SourceMap) -> Option<(&'a Path, &'a str)> {
    err.span().and_then(|span| sources.get_source(span.file_id))
}
