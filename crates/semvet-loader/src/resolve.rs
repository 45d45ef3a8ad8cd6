//! Name resolution: turn parsed files into graph types and packages.
//!
//! Two phases. Phase one allocates a named-type declaration (and its type
//! parameters) for every type declaration in every package, which is what
//! lets recursive and mutually recursive references resolve. Phase two
//! resolves aliases, underlyings, methods, and value objects.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use semvet_types::{
    BasicKind, Field, InterfaceShape, Method, ModuleInfo, Package, SignatureShape, Term, TypeData,
    TypeGraph, TypeId, TypeParamId,
};

use crate::parser::{Decl, FileAst, FuncDecl, FuncType, LitKind, TypeExpr, UnionExpr, ValueDecl,
    ValueKind};

/// One package's worth of parsed files.
pub struct PackageSource {
    pub path: String,
    pub files: Vec<FileAst>,
}

struct AliasEntry {
    pkg_path: String,
    imports: FxHashMap<String, String>,
    expr: TypeExpr,
}

struct Resolver<'g> {
    graph: &'g mut TypeGraph,
    /// (package path, name) → declared type.
    symbols: FxHashMap<(String, String), TypeId>,
    /// Declared type parameters per named type, in order, for receivers.
    named_type_params: FxHashMap<(String, String), Vec<(String, TypeId, TypeParamId)>>,
    aliases: FxHashMap<(String, String), AliasEntry>,
    alias_stack: FxHashSet<(String, String)>,
    /// Opaque stand-ins for types declared outside the loaded tree.
    externals: FxHashMap<(String, String), TypeId>,
}

struct Scope<'a> {
    pkg_path: &'a str,
    imports: &'a FxHashMap<String, String>,
    type_params: FxHashMap<String, TypeId>,
}

pub fn resolve(
    graph: &mut TypeGraph,
    module: Option<ModuleInfo>,
    sources: Vec<PackageSource>,
) -> Vec<Package> {
    let mut r = Resolver {
        graph,
        symbols: FxHashMap::default(),
        named_type_params: FxHashMap::default(),
        aliases: FxHashMap::default(),
        alias_stack: FxHashSet::default(),
        externals: FxHashMap::default(),
    };

    let import_maps: Vec<Vec<FxHashMap<String, String>>> = sources
        .iter()
        .map(|pkg| pkg.files.iter().map(import_map).collect())
        .collect();

    // Phase one: allocate every named type and its type parameters.
    for (pkg_idx, pkg) in sources.iter().enumerate() {
        for (file_idx, file) in pkg.files.iter().enumerate() {
            for decl in &file.decls {
                let Decl::Type(td) = decl else { continue };
                if td.alias {
                    r.aliases.insert(
                        (pkg.path.clone(), td.name.clone()),
                        AliasEntry {
                            pkg_path: pkg.path.clone(),
                            imports: import_maps[pkg_idx][file_idx].clone(),
                            expr: td.expr.clone(),
                        },
                    );
                    continue;
                }
                let named = r.graph.named(&td.name, &pkg.path);
                let mut params = Vec::new();
                for group in &td.type_params {
                    for name in &group.names {
                        let tp = r.graph.type_param(name);
                        if let TypeData::TypeParam(pid) = *r.graph.data(tp) {
                            params.push((name.clone(), tp, pid));
                        }
                    }
                }
                r.graph
                    .set_type_params(named, params.iter().map(|(_, _, pid)| *pid).collect());
                r.named_type_params
                    .insert((pkg.path.clone(), td.name.clone()), params);
                r.symbols.insert((pkg.path.clone(), td.name.clone()), named);
            }
        }
    }

    // Phase two: aliases first, then underlyings, functions, and values.
    let alias_keys: Vec<(String, String)> = r.aliases.keys().cloned().collect();
    for key in alias_keys {
        r.resolve_alias(&key);
    }

    let mut packages = Vec::new();
    for (pkg_idx, pkg) in sources.iter().enumerate() {
        let mut out = Package::new(pkg.path.clone());
        out.module = module.clone();

        for (file_idx, file) in pkg.files.iter().enumerate() {
            let imports = &import_maps[pkg_idx][file_idx];
            for decl in &file.decls {
                match decl {
                    Decl::Type(td) => {
                        let key = (pkg.path.clone(), td.name.clone());
                        let Some(&named) = r.symbols.get(&key) else {
                            continue;
                        };
                        if td.alias {
                            out.objects.insert(td.name.clone(), named);
                            continue;
                        }
                        let params = r.named_type_params.get(&key).cloned().unwrap_or_default();
                        let scope = Scope {
                            pkg_path: &pkg.path,
                            imports,
                            type_params: params
                                .iter()
                                .map(|(name, tp, _)| (name.clone(), *tp))
                                .collect(),
                        };
                        // Constraints may mention sibling type parameters.
                        let mut declared = params.iter();
                        for group in &td.type_params {
                            let constraint = r.resolve_type(&group.ty, &scope);
                            for _ in &group.names {
                                if let Some((_, tp, _)) = declared.next() {
                                    r.graph.set_constraint(*tp, constraint);
                                }
                            }
                        }
                        let underlying = r.resolve_type(&td.expr, &scope);
                        r.graph.set_underlying(named, underlying);
                        out.objects.insert(td.name.clone(), named);
                    }
                    Decl::Func(fd) => {
                        r.resolve_func(fd, &pkg.path, imports, &mut out);
                    }
                    Decl::Value(vd) => {
                        let scope = Scope {
                            pkg_path: &pkg.path,
                            imports,
                            type_params: FxHashMap::default(),
                        };
                        match r.resolve_value(vd, &scope) {
                            Some(ty) => {
                                out.objects.insert(vd.name.clone(), ty);
                            }
                            None => {
                                debug!(
                                    name = %vd.name,
                                    package = %pkg.path,
                                    "initializer type not inferrable; object skipped"
                                );
                            }
                        }
                    }
                }
            }
        }
        packages.push(out);
    }
    packages.sort_by(|a, b| a.path.cmp(&b.path));
    packages
}

fn import_map(file: &FileAst) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    for imp in &file.imports {
        let local = match &imp.alias {
            Some(alias) => alias.clone(),
            None => imp
                .path
                .rsplit('/')
                .next()
                .unwrap_or(imp.path.as_str())
                .to_owned(),
        };
        map.insert(local, imp.path.clone());
    }
    map
}

impl Resolver<'_> {
    fn resolve_alias(&mut self, key: &(String, String)) -> Option<TypeId> {
        if let Some(&id) = self.symbols.get(key) {
            return Some(id);
        }
        if !self.alias_stack.insert(key.clone()) {
            return None;
        }
        let (pkg_path, imports, expr) = {
            let entry = self.aliases.get(key)?;
            (entry.pkg_path.clone(), entry.imports.clone(), entry.expr.clone())
        };
        let scope = Scope {
            pkg_path: &pkg_path,
            imports: &imports,
            type_params: FxHashMap::default(),
        };
        let ty = self.resolve_type(&expr, &scope);
        self.alias_stack.remove(key);
        self.symbols.insert(key.clone(), ty);
        Some(ty)
    }

    fn resolve_func(
        &mut self,
        fd: &FuncDecl,
        pkg_path: &str,
        imports: &FxHashMap<String, String>,
        out: &mut Package,
    ) {
        let mut scope = Scope {
            pkg_path,
            imports,
            type_params: FxHashMap::default(),
        };
        let mut sig_params: Vec<TypeParamId> = Vec::new();

        if let Some(recv) = &fd.receiver {
            // Receiver type parameters bind positionally to the ones the
            // type declared.
            let declared = self
                .named_type_params
                .get(&(pkg_path.to_owned(), recv.base.clone()))
                .cloned()
                .unwrap_or_default();
            for (name, (_, tp, _)) in recv.type_params.iter().zip(declared.iter()) {
                scope.type_params.insert(name.clone(), *tp);
            }
        } else {
            for group in &fd.type_params {
                let mut ids = Vec::new();
                for name in &group.names {
                    let tp = self.graph.type_param(name);
                    scope.type_params.insert(name.clone(), tp);
                    if let TypeData::TypeParam(pid) = *self.graph.data(tp) {
                        ids.push((tp, pid));
                    }
                }
                let constraint = self.resolve_type(&group.ty, &scope);
                for (tp, pid) in ids {
                    self.graph.set_constraint(tp, constraint);
                    sig_params.push(pid);
                }
            }
        }

        let sig = self.build_signature(&fd.func, sig_params, &scope);

        match &fd.receiver {
            Some(recv) => {
                let key = (pkg_path.to_owned(), recv.base.clone());
                if let Some(&named) = self.symbols.get(&key) {
                    self.graph.add_method(
                        named,
                        Method {
                            name: fd.name.clone(),
                            sig,
                            pkg_path: pkg_path.to_owned(),
                        },
                    );
                } else {
                    debug!(receiver = %recv.base, method = %fd.name, "method on unknown type");
                }
            }
            None => {
                out.objects.insert(fd.name.clone(), sig);
            }
        }
    }

    fn resolve_value(&mut self, vd: &ValueDecl, scope: &Scope<'_>) -> Option<TypeId> {
        if let Some(ty) = &vd.ty {
            return Some(self.resolve_type(ty, scope));
        }
        let ty = match (vd.lit.as_ref()?, vd.kind) {
            // Constants stay untyped; variable initializers default.
            (LitKind::Int, ValueKind::Const) => self.graph.basic(BasicKind::UntypedInt),
            (LitKind::Int, ValueKind::Var) => self.graph.basic(BasicKind::Int),
            (LitKind::Float, ValueKind::Const) => self.graph.basic(BasicKind::UntypedFloat),
            (LitKind::Float, ValueKind::Var) => self.graph.basic(BasicKind::Float64),
            (LitKind::Complex, ValueKind::Const) => self.graph.basic(BasicKind::UntypedComplex),
            (LitKind::Complex, ValueKind::Var) => self.graph.basic(BasicKind::Complex128),
            (LitKind::Rune, ValueKind::Const) => self.graph.basic(BasicKind::UntypedRune),
            (LitKind::Rune, ValueKind::Var) => self.graph.basic(BasicKind::Int32),
            (LitKind::Str, ValueKind::Const) => self.graph.basic(BasicKind::UntypedString),
            (LitKind::Str, ValueKind::Var) => self.graph.basic(BasicKind::String),
            (LitKind::Bool, ValueKind::Const) => self.graph.basic(BasicKind::UntypedBool),
            (LitKind::Bool, ValueKind::Var) => self.graph.basic(BasicKind::Bool),
            (LitKind::Expr(expr), _) => {
                let expr = expr.clone();
                self.resolve_type(&expr, scope)
            }
            (LitKind::PointerExpr(expr), _) => {
                let expr = expr.clone();
                let inner = self.resolve_type(&expr, scope);
                self.graph.pointer(inner)
            }
        };
        Some(ty)
    }

    fn build_signature(
        &mut self,
        func: &FuncType,
        type_params: Vec<TypeParamId>,
        scope: &Scope<'_>,
    ) -> TypeId {
        let mut params = Vec::new();
        for group in &func.params {
            let ty = self.resolve_type(&group.ty, scope);
            let count = group.names.len().max(1);
            params.extend(std::iter::repeat_n(ty, count));
        }
        if func.variadic {
            if let Some(last) = params.last_mut() {
                *last = self.graph.slice(*last);
            }
        }
        let mut results = Vec::new();
        for group in &func.results {
            let ty = self.resolve_type(&group.ty, scope);
            let count = group.names.len().max(1);
            results.extend(std::iter::repeat_n(ty, count));
        }
        self.graph.signature(SignatureShape {
            type_params,
            params,
            results,
            variadic: func.variadic,
        })
    }

    fn resolve_type(&mut self, expr: &TypeExpr, scope: &Scope<'_>) -> TypeId {
        match expr {
            TypeExpr::Name {
                pkg: None,
                name,
                args,
                ..
            } => {
                if !args.is_empty() {
                    debug!(name = %name, "type arguments are resolved to the generic type");
                }
                if let Some(&tp) = scope.type_params.get(name) {
                    return tp;
                }
                if let Some(basic) = basic_kind(name) {
                    return self.graph.basic(basic);
                }
                match name.as_str() {
                    "any" => return self.graph.any_type(),
                    "comparable" => return self.graph.comparable_type(),
                    "error" => return self.graph.error_type(),
                    _ => {}
                }
                let key = (scope.pkg_path.to_owned(), name.clone());
                if let Some(&id) = self.symbols.get(&key) {
                    return id;
                }
                if self.aliases.contains_key(&key) {
                    if let Some(id) = self.resolve_alias(&key) {
                        return id;
                    }
                }
                // Dot imports pull another package's scope in.
                for (local, path) in scope.imports {
                    if local == "." {
                        if let Some(&id) = self.symbols.get(&(path.clone(), name.clone())) {
                            return id;
                        }
                    }
                }
                self.external(String::new(), name.clone())
            }
            TypeExpr::Name {
                pkg: Some(pkg),
                name,
                ..
            } => {
                if pkg == "unsafe" && name == "Pointer" {
                    return self.graph.basic(BasicKind::UnsafePointer);
                }
                let path = scope
                    .imports
                    .get(pkg)
                    .cloned()
                    .unwrap_or_else(|| pkg.clone());
                let key = (path, name.clone());
                if let Some(&id) = self.symbols.get(&key) {
                    return id;
                }
                if self.aliases.contains_key(&key) {
                    if let Some(id) = self.resolve_alias(&key) {
                        return id;
                    }
                }
                self.external(key.0, key.1)
            }
            TypeExpr::Pointer(elem) => {
                let elem = self.resolve_type(elem, scope);
                self.graph.pointer(elem)
            }
            TypeExpr::Slice(elem) => {
                let elem = self.resolve_type(elem, scope);
                self.graph.slice(elem)
            }
            TypeExpr::Array { len, elem } => {
                let elem = self.resolve_type(elem, scope);
                self.graph.array(*len, elem)
            }
            TypeExpr::Map { key, value } => {
                let key = self.resolve_type(key, scope);
                let value = self.resolve_type(value, scope);
                self.graph.map_of(key, value)
            }
            TypeExpr::Chan { dir, elem } => {
                let elem = self.resolve_type(elem, scope);
                self.graph.chan_of(*dir, elem)
            }
            TypeExpr::Func(func) => self.build_signature(func, Vec::new(), scope),
            TypeExpr::Struct { fields } => {
                let mut out = Vec::new();
                for field in fields {
                    let ty = self.resolve_type(&field.ty, scope);
                    if field.embedded {
                        out.push(Field {
                            name: embedded_name(&field.ty),
                            ty,
                            tag: field.tag.clone(),
                            embedded: true,
                            pkg_path: scope.pkg_path.to_owned(),
                        });
                    } else {
                        for name in &field.names {
                            out.push(Field {
                                name: name.clone(),
                                ty,
                                tag: field.tag.clone(),
                                embedded: false,
                                pkg_path: scope.pkg_path.to_owned(),
                            });
                        }
                    }
                }
                self.graph.strukt(out)
            }
            TypeExpr::Interface { methods, embeds } => {
                let mut shape_methods = Vec::new();
                for m in methods {
                    let sig = self.build_signature(&m.func, Vec::new(), scope);
                    shape_methods.push(Method {
                        name: m.name.clone(),
                        sig,
                        pkg_path: scope.pkg_path.to_owned(),
                    });
                }
                let mut embeddeds = Vec::new();
                for union in embeds {
                    embeddeds.push(self.resolve_union(union, scope));
                }
                self.graph.interface(InterfaceShape {
                    methods: shape_methods,
                    embeddeds,
                    comparable: false,
                })
            }
        }
    }

    fn resolve_union(&mut self, union: &UnionExpr, scope: &Scope<'_>) -> TypeId {
        if union.terms.len() == 1 && !union.terms[0].0 {
            return self.resolve_type(&union.terms[0].1, scope);
        }
        let terms: Vec<Term> = union
            .terms
            .iter()
            .map(|(tilde, expr)| Term {
                tilde: *tilde,
                ty: self.resolve_type(expr, scope),
            })
            .collect();
        self.graph.union(terms)
    }

    fn external(&mut self, pkg_path: String, name: String) -> TypeId {
        let key = (pkg_path, name);
        if let Some(&id) = self.externals.get(&key) {
            return id;
        }
        debug!(package = %key.0, name = %key.1, "opaque external type");
        let id = self.graph.named(&key.1, &key.0);
        self.externals.insert(key, id);
        id
    }
}

/// The implicit name of an embedded field: the base name of its type.
fn embedded_name(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Pointer(inner) => embedded_name(inner),
        TypeExpr::Name { name, .. } => name.clone(),
        _ => String::new(),
    }
}

fn basic_kind(name: &str) -> Option<BasicKind> {
    Some(match name {
        "bool" => BasicKind::Bool,
        "int" => BasicKind::Int,
        "int8" => BasicKind::Int8,
        "int16" => BasicKind::Int16,
        "int32" => BasicKind::Int32,
        "int64" => BasicKind::Int64,
        "uint" => BasicKind::Uint,
        "uint8" => BasicKind::Uint8,
        "uint16" => BasicKind::Uint16,
        "uint32" => BasicKind::Uint32,
        "uint64" => BasicKind::Uint64,
        "uintptr" => BasicKind::Uintptr,
        "float32" => BasicKind::Float32,
        "float64" => BasicKind::Float64,
        "complex64" => BasicKind::Complex64,
        "complex128" => BasicKind::Complex128,
        "string" => BasicKind::String,
        "byte" => BasicKind::Uint8,
        "rune" => BasicKind::Int32,
        _ => return None,
    })
}
