//! The diagnostics stream: one line per veto, then a summary.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::diagnostics::{format_located, UnbedError};
use crate::unbed::Veto;

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Rewritten selectors.
    pub selections: usize,
    /// Files with at least one rewrite.
    pub files: usize,
    /// Packages with at least one rewritten file.
    pub units: usize,
    pub vetoes: usize,
}

pub struct Reporter<W: Write> {
    out: W,
    stats: Stats,
    units: HashSet<String>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, stats: Stats::default(), units: HashSet::new() }
    }

    /// `file:line:col: reason`
    pub fn veto(&mut self, path: &Path, source: &str, veto: &Veto) -> Result<(), UnbedError> {
        self.stats.vetoes += 1;
        let line = format_located(path, source, veto.span, &veto.reason.to_string());
        writeln!(self.out, "{line}").map_err(|e| UnbedError::io(path, e))
    }

    /// Count a file of package `unit` rewritten at `edits` places.
    pub fn rewrote(&mut self, unit: &str, edits: usize) {
        if edits == 0 {
            return;
        }
        self.stats.selections += edits;
        self.stats.files += 1;
        if self.units.insert(unit.to_string()) {
            self.stats.units += 1;
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn summary(&mut self, dry_run: bool) -> Result<(), UnbedError> {
        let Stats { selections, files, units, .. } = self.stats;
        let verb = if dry_run { "Would rewrite" } else { "Rewrote" };
        writeln!(self.out, "{verb} {selections} selections in {files} files in {units} units.")
            .map_err(|e| UnbedError::io("<diagnostics>", e))
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::unbed::VetoReason;

    #[test]
    fn veto_lines_and_summary() {
        let mut r = Reporter::new(Vec::new());
        let source = "package p\nvar a = unsafe.Offsetof(o.N)\n";
        let veto = Veto { span: Span::new(36, 37), reason: VetoReason::Offsetof { member: "N".into() } };
        r.veto(Path::new("p/a.go"), source, &veto).unwrap();
        r.rewrote("m/p", 2);
        r.rewrote("m/p", 1);
        r.rewrote("m/q", 0);
        r.summary(false).unwrap();

        let out = String::from_utf8(r.into_inner()).unwrap();
        insta::assert_snapshot!(out, @r"
        p/a.go:2:27: not rewriting unsafe.Offsetof argument N: an explicit path changes the offset
        Rewrote 3 selections in 2 files in 1 units.
        ");
    }

    #[test]
    fn dry_run_summary_with_no_matches() {
        let mut r = Reporter::new(Vec::new());
        r.summary(true).unwrap();
        assert_eq!(r.stats(), Stats::default());
        assert_eq!(String::from_utf8(r.into_inner()).unwrap(), "Would rewrite 0 selections in 0 files in 0 units.\n");
    }
}
