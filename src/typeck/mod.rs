pub mod check;
pub mod env;
pub mod infer;
pub mod info;
pub mod lookup;
pub mod register;
pub mod resolve;
pub mod types;

use std::collections::{HashMap, HashSet};

use crate::diagnostics::UnbedError;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use env::{universe, Entity, LocalEnv, Scope};
use info::{Mode, TypeAndMode, TypeInfo};
use types::{package_name_of, TypeId, Types};

/// Result of checking an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Operand {
    pub mode: Mode,
    pub ty: TypeId,
    /// Integer value of a constant, when known.
    pub val: Option<i128>,
}

impl Operand {
    pub fn value(ty: TypeId) -> Self {
        Self { mode: Mode::Value, ty, val: None }
    }

    pub fn variable(ty: TypeId) -> Self {
        Self { mode: Mode::Variable, ty, val: None }
    }

    pub fn constant(ty: TypeId, val: Option<i128>) -> Self {
        Self { mode: Mode::Constant, ty, val }
    }

    pub fn type_(ty: TypeId) -> Self {
        Self { mode: Mode::Type, ty, val: None }
    }

    pub fn no_value() -> Self {
        Self { mode: Mode::NoValue, ty: Types::INVALID, val: None }
    }
}

#[derive(Debug, Clone, Copy)]
enum GlobalDecl<'a> {
    /// Defined types are created up front; only aliases resolve lazily.
    Type(&'a Spanned<TypeSpec>),
    Var(&'a Spanned<ValueSpec>),
    Const { spec: &'a Spanned<ValueSpec>, init: &'a Spanned<ValueSpec> },
    Func(&'a Spanned<FuncDecl>),
}

#[derive(Debug, Clone)]
enum GlobalState {
    Pending,
    InProgress,
    Done(Entity),
}

#[derive(Debug)]
struct Global<'a> {
    file: usize,
    decl: GlobalDecl<'a>,
    state: GlobalState,
}

/// Type checker for one package. Shares the `Types` arena with every other
/// package of the program.
pub struct Checker<'a> {
    types: &'a mut Types,
    imports: &'a HashMap<String, Scope>,
    path: String,
    name: String,
    /// Per file: local import name to import path.
    file_imports: Vec<HashMap<String, String>>,
    globals: HashMap<String, Global<'a>>,
    /// Value specs in declaration order, including all-blank ones.
    value_specs: Vec<(usize, GlobalDecl<'a>)>,
    /// Defined types whose underlying type has not been resolved yet.
    pending_named: HashMap<TypeId, (usize, &'a Spanned<TypeSpec>)>,
    resolving_named: HashSet<TypeId>,
    named_decls: Vec<(TypeId, &'a Spanned<TypeSpec>)>,
    funcs: Vec<(usize, &'a Spanned<FuncDecl>)>,
    methods: Vec<(usize, &'a Spanned<FuncDecl>)>,
    infos: Vec<TypeInfo>,
    cur_file: usize,
    locals: LocalEnv,
    iota: Option<i128>,
    results: Vec<Vec<TypeId>>,
}

/// Type-check the files of one package. `imports` maps import paths of
/// already-checked workspace packages to their scopes; any other import is
/// treated as external. Returns the package scope and per-file type info.
pub fn check_package(
    types: &mut Types,
    imports: &HashMap<String, Scope>,
    path: &str,
    files: &[&File],
) -> Result<(Scope, Vec<TypeInfo>), UnbedError> {
    let Some(first) = files.first() else {
        return Err(UnbedError::load(format!("package {path} has no files")));
    };
    let name = first.package.node.clone();
    for f in files {
        if f.package.node != name {
            return Err(UnbedError::type_err(
                format!("package {}; expected package {name}", f.package.node),
                f.package.span,
            ));
        }
    }

    let mut checker = Checker {
        types,
        imports,
        path: path.to_string(),
        name,
        file_imports: Vec::new(),
        globals: HashMap::new(),
        value_specs: Vec::new(),
        pending_named: HashMap::new(),
        resolving_named: HashSet::new(),
        named_decls: Vec::new(),
        funcs: Vec::new(),
        methods: Vec::new(),
        infos: vec![TypeInfo::default(); files.len()],
        cur_file: 0,
        locals: LocalEnv::default(),
        iota: None,
        results: Vec::new(),
    };

    // Pass 1: imports and top-level declarations
    for (i, f) in files.iter().copied().enumerate() {
        checker.collect_imports(f)?;
        checker.collect_decls(i, f)?;
    }

    // Pass 2: underlying types of defined types
    let named: Vec<TypeId> = checker.named_decls.iter().map(|(t, _)| *t).collect();
    for ty in &named {
        checker.ensure_underlying(*ty)?;
    }
    checker.check_value_cycles()?;

    // Pass 3: method sets
    checker.register_methods()?;

    // Pass 4: remaining package-level objects
    checker.resolve_all_globals()?;

    // Pass 5: function bodies
    checker.check_bodies()?;

    let mut scope = Scope { name: checker.name.clone(), path: checker.path.clone(), entities: HashMap::new() };
    for (name, global) in &checker.globals {
        if let GlobalState::Done(entity) = &global.state {
            scope.entities.insert(name.clone(), entity.clone());
        }
    }
    Ok((scope, std::mem::take(&mut checker.infos)))
}

impl<'a> Checker<'a> {
    fn collect_imports(&mut self, file: &File) -> Result<(), UnbedError> {
        let mut names: HashMap<String, String> = HashMap::new();
        for import in &file.imports {
            let path = &import.node.path.node;
            let local = match &import.node.alias {
                Some(alias) if alias.node == "_" || alias.node == "." => {
                    return Err(UnbedError::type_err(
                        format!("import with {} alias is not supported", alias.node),
                        alias.span,
                    ));
                }
                Some(alias) => alias.node.clone(),
                None => match self.imports.get(path) {
                    Some(scope) => scope.name.clone(),
                    None => package_name_of(path).to_string(),
                },
            };
            if names.insert(local.clone(), path.clone()).is_some() {
                return Err(UnbedError::type_err(format!("{local} redeclared in this block"), import.span));
            }
        }
        self.file_imports.push(names);
        Ok(())
    }

    /// Run `f` in the context of file `file` with no local scopes.
    fn in_file<T>(&mut self, file: usize, f: impl FnOnce(&mut Self) -> Result<T, UnbedError>) -> Result<T, UnbedError> {
        let saved_file = std::mem::replace(&mut self.cur_file, file);
        let saved_locals = std::mem::take(&mut self.locals);
        let saved_iota = self.iota.take();
        let saved_results = std::mem::take(&mut self.results);
        let out = f(self);
        self.cur_file = saved_file;
        self.locals = saved_locals;
        self.iota = saved_iota;
        self.results = saved_results;
        out
    }

    /// Resolve a name through local scopes, the file's imports, the package
    /// scope, then the universe.
    fn lookup(&mut self, name: &str, span: Span) -> Result<Option<Entity>, UnbedError> {
        if let Some(entity) = self.locals.lookup(name) {
            return Ok(Some(entity.clone()));
        }
        if let Some(path) = self.file_imports.get(self.cur_file).and_then(|m| m.get(name)) {
            return Ok(Some(Entity::Package(path.clone())));
        }
        if self.globals.contains_key(name) {
            return self.resolve_global(name, span).map(Some);
        }
        Ok(universe(self.types, name))
    }

    fn record(&mut self, id: ExprId, op: &Operand) {
        self.infos[self.cur_file].types.insert(id, TypeAndMode { mode: op.mode, ty: op.ty });
    }

    fn err(&self, msg: impl Into<String>, span: Span) -> UnbedError {
        UnbedError::type_err(msg, span)
    }
}
