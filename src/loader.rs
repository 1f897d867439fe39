//! Workspace loading: package discovery, the import graph, and type checking
//! of the packages a rewrite can affect.
//!
//! Every directory holding `.go` files is a package whose import path is the
//! module path joined with the directory's path relative to the root. Files
//! declaring `package <name>_test` form a separate external test unit.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::diagnostics::UnbedError;
use crate::manifest::Manifest;
use crate::parser::ast::File;
use crate::parser::parse_file;
use crate::typeck::check_package;
use crate::typeck::env::Scope;
use crate::typeck::info::TypeInfo;
use crate::typeck::types::Types;

/// Every file read during a run, indexed by the `file_id` in spans.
#[derive(Debug, Default)]
pub struct SourceMap {
    pub files: Vec<(PathBuf, String)>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: PathBuf, source: String) -> u32 {
        let id = self.files.len() as u32;
        self.files.push((path, source));
        id
    }

    pub fn get_source(&self, file_id: u32) -> Option<(&Path, &str)> {
        self.files.get(file_id as usize).map(|(p, s)| (p.as_path(), s.as_str()))
    }
}

#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub file_id: u32,
    pub ast: File,
}

/// A type-checked package.
#[derive(Debug)]
pub struct TypedUnit {
    /// Import path; external test units end in `_test`.
    pub path: String,
    /// Name from the package clause.
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<ParsedFile>,
    /// Type information per file, parallel to `files`.
    pub infos: Vec<TypeInfo>,
    pub scope: Scope,
    /// The target package or one of its transitive importers. Only these
    /// units are rewritten; the rest are loaded for their types.
    pub initial: bool,
}

#[derive(Debug)]
pub struct Program {
    pub types: Types,
    /// Import path of the package declaring the target type.
    pub target: String,
    /// Units in dependency order.
    pub units: Vec<TypedUnit>,
}

impl Program {
    pub fn unit(&self, path: &str) -> Option<&TypedUnit> {
        self.units.iter().find(|u| u.path == path)
    }

    pub fn initial_units(&self) -> impl Iterator<Item = &TypedUnit> {
        self.units.iter().filter(|u| u.initial)
    }
}

/// A package found on disk, parsed but not yet checked.
struct RawUnit {
    path: String,
    name: String,
    dir: PathBuf,
    files: Vec<ParsedFile>,
    imports: HashSet<String>,
}

/// Load the package `target` and every workspace package that imports it,
/// directly or transitively, plus the workspace packages those depend on.
pub fn load(root: &Path, target: &str, manifest: &Manifest, sources: &mut SourceMap) -> Result<Program, UnbedError> {
    let module = module_path(root)?;
    debug!(module = %module, root = %root.display(), "loading workspace");

    let mut dirs = Vec::new();
    collect_dirs(root, root, manifest, &mut dirs)?;

    let mut raw: Vec<RawUnit> = Vec::new();
    for dir in dirs {
        raw.extend(load_dir(root, &dir, &module, manifest, sources)?);
    }
    let by_path: HashMap<String, usize> = raw.iter().enumerate().map(|(i, u)| (u.path.clone(), i)).collect();
    // A container may also be named relative to the module path.
    let target = [target.to_string(), format!("{module}/{target}")]
        .into_iter()
        .find(|p| by_path.contains_key(p))
        .ok_or_else(|| UnbedError::load(format!("package {target} not found in workspace (module {module})")))?;

    let closure = reverse_closure(&raw, &by_path, &target);
    let needed = with_dependencies(&raw, &by_path, &closure);
    let order = topo_order(&raw, &by_path, &needed)?;
    info!(packages = order.len(), rewritable = closure.len(), "type-checking packages");

    let mut types = Types::new();
    let mut scopes: HashMap<String, Scope> = HashMap::new();
    let mut slots: Vec<Option<RawUnit>> = raw.into_iter().map(Some).collect();
    let mut units = Vec::with_capacity(order.len());
    for idx in order {
        let Some(unit) = slots[idx].take() else { continue };
        let asts: Vec<&File> = unit.files.iter().map(|f| &f.ast).collect();
        let (scope, infos) = check_package(&mut types, &scopes, &unit.path, &asts)?;
        debug!(package = %unit.path, files = unit.files.len(), "checked");
        scopes.insert(unit.path.clone(), scope.clone());
        units.push(TypedUnit {
            initial: closure.contains(&idx),
            path: unit.path,
            name: unit.name,
            dir: unit.dir,
            files: unit.files,
            infos,
            scope,
        });
    }
    Ok(Program { types, units, target })
}

/// The `module` line of `go.mod`, or the root directory's name without one.
fn module_path(root: &Path) -> Result<String, UnbedError> {
    let go_mod = root.join("go.mod");
    if go_mod.is_file() {
        let content = std::fs::read_to_string(&go_mod).map_err(|e| UnbedError::io(&go_mod, e))?;
        for line in content.lines() {
            if let Some(rest) = line.trim().strip_prefix("module") {
                let path = rest.trim().trim_matches('"');
                if !path.is_empty() && rest.starts_with(char::is_whitespace) {
                    return Ok(path.to_string());
                }
            }
        }
        return Err(UnbedError::load(format!("no module line in {}", go_mod.display())));
    }
    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "main".to_string());
    Ok(name)
}

/// Directories under `dir` that may hold packages, sorted.
fn collect_dirs(root: &Path, dir: &Path, manifest: &Manifest, out: &mut Vec<PathBuf>) -> Result<(), UnbedError> {
    out.push(dir.to_path_buf());
    let entries = std::fs::read_dir(dir).map_err(|e| UnbedError::io(dir, e))?;
    let mut subdirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    for sub in subdirs {
        let name = sub.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let rel = sub.strip_prefix(root).unwrap_or(&sub);
        if name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor" {
            continue;
        }
        if manifest.excludes(rel) {
            debug!(dir = %rel.display(), "excluded by manifest");
            continue;
        }
        // A nested module is a different workspace.
        if sub.join("go.mod").is_file() {
            continue;
        }
        collect_dirs(root, &sub, manifest, out)?;
    }
    Ok(())
}

fn import_path(module: &str, root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    if parts.is_empty() {
        module.to_string()
    } else {
        format!("{module}/{}", parts.join("/"))
    }
}

/// Parse the `.go` files of one directory into at most two units: the
/// package itself (with its in-package tests) and its external test package.
fn load_dir(
    root: &Path,
    dir: &Path,
    module: &str,
    manifest: &Manifest,
    sources: &mut SourceMap,
) -> Result<Vec<RawUnit>, UnbedError> {
    let entries = std::fs::read_dir(dir).map_err(|e| UnbedError::io(dir, e))?;
    let mut go_files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "go"))
        .filter(|p| manifest.tests || !p.to_string_lossy().ends_with("_test.go"))
        .collect();
    go_files.sort();
    if go_files.is_empty() {
        return Ok(Vec::new());
    }

    let mut parsed = Vec::with_capacity(go_files.len());
    for path in go_files {
        let source = std::fs::read_to_string(&path).map_err(|e| UnbedError::io(&path, e))?;
        let file_id = sources.add_file(path.clone(), source);
        let Some((_, source)) = sources.get_source(file_id) else {
            return Err(UnbedError::load(format!("lost source of {}", path.display())));
        };
        let ast = parse_file(source, file_id)?;
        parsed.push(ParsedFile { path, file_id, ast });
    }

    // The package name comes from non-test files, or from test files when
    // the directory holds nothing else.
    let is_test = |f: &ParsedFile| f.path.to_string_lossy().ends_with("_test.go");
    let primary = parsed
        .iter()
        .find(|f| !is_test(f))
        .or_else(|| parsed.iter().find(|f| !f.ast.package.node.ends_with("_test")))
        .or_else(|| parsed.first())
        .map(|f| f.ast.package.node.clone())
        .unwrap_or_default();
    let external = format!("{primary}_test");

    let path = import_path(module, root, dir);
    let mut pkg = RawUnit { path: path.clone(), name: primary.clone(), dir: dir.to_path_buf(), files: Vec::new(), imports: HashSet::new() };
    let mut xtest = RawUnit { path: format!("{path}_test"), name: external.clone(), dir: dir.to_path_buf(), files: Vec::new(), imports: HashSet::new() };

    for file in parsed {
        let name = &file.ast.package.node;
        let unit = if *name == primary {
            &mut pkg
        } else if *name == external && is_test(&file) {
            &mut xtest
        } else {
            return Err(UnbedError::load(format!(
                "found packages {primary} and {name} in {}",
                dir.display()
            )));
        };
        unit.imports.extend(file.ast.imports.iter().map(|i| i.node.path.node.clone()));
        unit.files.push(file);
    }

    let mut units = Vec::new();
    for unit in [pkg, xtest] {
        if !unit.files.is_empty() {
            debug!(package = %unit.path, files = unit.files.len(), "found package");
            units.push(unit);
        }
    }
    Ok(units)
}

/// `target` and every unit that imports it, directly or transitively.
fn reverse_closure(raw: &[RawUnit], by_path: &HashMap<String, usize>, target: &str) -> HashSet<usize> {
    let mut importers: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, unit) in raw.iter().enumerate() {
        for imp in &unit.imports {
            if let Some(&j) = by_path.get(imp) {
                importers.entry(j).or_default().push(i);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    if let Some(&t) = by_path.get(target) {
        seen.insert(t);
        queue.push_back(t);
    }
    while let Some(i) = queue.pop_front() {
        for &j in importers.get(&i).into_iter().flatten() {
            if seen.insert(j) {
                queue.push_back(j);
            }
        }
    }
    seen
}

/// `units` plus the workspace units they depend on.
fn with_dependencies(raw: &[RawUnit], by_path: &HashMap<String, usize>, units: &HashSet<usize>) -> HashSet<usize> {
    let mut seen = units.clone();
    let mut stack: Vec<usize> = units.iter().copied().collect();
    while let Some(i) = stack.pop() {
        for imp in &raw[i].imports {
            if let Some(&j) = by_path.get(imp) {
                if seen.insert(j) {
                    stack.push(j);
                }
            }
        }
    }
    seen
}

/// Dependency order over `needed`, rejecting import cycles.
fn topo_order(raw: &[RawUnit], by_path: &HashMap<String, usize>, needed: &HashSet<usize>) -> Result<Vec<usize>, UnbedError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        i: usize,
        raw: &[RawUnit],
        by_path: &HashMap<String, usize>,
        marks: &mut BTreeMap<usize, Mark>,
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), UnbedError> {
        match marks.get(&i) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|&s| s == i).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..].iter().map(|&s| raw[s].path.as_str()).collect();
                cycle.push(&raw[i].path);
                return Err(UnbedError::load(format!("import cycle not allowed: {}", cycle.join(" -> "))));
            }
            None => {}
        }
        marks.insert(i, Mark::Visiting);
        stack.push(i);
        let mut deps: Vec<usize> = raw[i].imports.iter().filter_map(|p| by_path.get(p).copied()).collect();
        deps.sort_unstable();
        for j in deps {
            visit(j, raw, by_path, marks, stack, order)?;
        }
        stack.pop();
        marks.insert(i, Mark::Done);
        order.push(i);
        Ok(())
    }

    let mut roots: Vec<usize> = needed.iter().copied().collect();
    roots.sort_unstable();
    let mut marks = BTreeMap::new();
    let mut order = Vec::with_capacity(roots.len());
    for i in roots {
        visit(i, raw, by_path, &mut marks, &mut Vec::new(), &mut order)?;
    }
    Ok(order)
}
