#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use unbed::diagnostics::UnbedError;
use unbed::loader::SourceMap;
use unbed::report::Reporter;
use unbed::{Options, Plan};

pub fn unbed_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_unbed"))
}

/// A module on disk under a temporary directory.
pub struct Workspace {
    dir: tempfile::TempDir,
}

/// Outcome of a library run: the plan and everything written to the
/// diagnostics stream.
pub struct Outcome {
    pub plan: Plan,
    pub diagnostics: String,
}

impl Workspace {
    /// A workspace with `go.mod` declaring `module` and the given files.
    pub fn new(module: &str, files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("go.mod"), format!("module {module}\n\ngo 1.21\n")).unwrap();
        let ws = Self { dir };
        for (name, content) in files {
            ws.write(name, content);
        }
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.file(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.file(rel)).unwrap()
    }

    pub fn options(&self, spec: &str) -> Options {
        Options { root: self.path().to_path_buf(), spec: spec.to_string(), insert_as: None, dry_run: false }
    }

    pub fn run(&self, spec: &str) -> Outcome {
        self.run_with(self.options(spec)).unwrap_or_else(|e| panic!("unbed {spec} failed: {e}"))
    }

    pub fn run_err(&self, spec: &str) -> UnbedError {
        match self.run_with(self.options(spec)) {
            Ok(_) => panic!("unbed {spec} should have failed"),
            Err(e) => e,
        }
    }

    pub fn run_with(&self, opts: Options) -> Result<Outcome, UnbedError> {
        let mut sources = SourceMap::new();
        let mut reporter = Reporter::new(Vec::new());
        let plan = unbed::run(&opts, &mut sources, &mut reporter)?;
        let diagnostics = String::from_utf8(reporter.into_inner()).unwrap();
        Ok(Outcome { plan, diagnostics })
    }
}

/// The declaring package used by most tests.
pub const GEOM: &str = r#"package geom

type Base struct {
	N int
}

func (b *Base) Inc() { b.N++ }

func (b Base) Get() int { return b.N }

type Outer struct {
	Base
	X int
}

func NewOuter() *Outer {
	o := &Outer{X: 1}
	o.N = 2
	return o
}
"#;
