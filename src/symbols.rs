//! The symbol graph: modules, packages, classes and members loaded from JSON,
//! plus the lookup contracts the resolver and renderer rely on.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use crate::doctext::DocComment;
use crate::error::Error;
use crate::resolver;
use crate::typeexpr::{self, TypeExpr};
use crate::types::{ErasedType, Param, Symbol, SymbolId, SymbolKind, TypeRef, TypeVarId, TypeVariable, is_primitive};

/// Qualified name of the root class, the erasure of unbounded variables.
pub const ROOT_CLASS: &str = "java.lang.Object";

// ── Contracts ───────────────────────────────────────────────────────

/// Read access to a symbol universe. Implementations must be safe to share
/// across page-rendering threads.
pub trait SymbolTable: Send + Sync {
    /// The symbol with this id, if it belongs to this table.
    fn symbol(&self, id: SymbolId) -> Option<&Symbol>;

    /// The type variable with this id, if it belongs to this table.
    fn type_variable(&self, id: TypeVarId) -> Option<&TypeVariable>;

    /// Module by qualified name.
    fn module_named(&self, name: &str) -> Option<SymbolId>;

    /// Package by qualified name.
    fn package_named(&self, name: &str) -> Option<SymbolId>;

    /// Class by qualified (dotted, outer-to-inner) name.
    fn class_named(&self, qualified: &str) -> Option<SymbolId>;

    /// Packages whose classes are visible everywhere without import.
    fn implicit_packages(&self) -> &[String];

    /// The symbol directly containing `id`.
    fn enclosing(&self, id: SymbolId) -> Option<SymbolId> {
        return self.symbol(id)?.enclosing;
    }

    /// The package containing `id`, or `id` itself if it is a package.
    fn package_of(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = Some(id);
        while let Some(here) = current {
            let symbol = self.symbol(here)?;
            if symbol.kind == SymbolKind::Package {
                return Some(here);
            }
            current = symbol.enclosing;
        }
        return None;
    }

    /// The innermost class at or around `id`.
    fn class_of(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = Some(id);
        while let Some(here) = current {
            let symbol = self.symbol(here)?;
            if symbol.kind.is_type() {
                return Some(here);
            }
            current = symbol.enclosing;
        }
        return None;
    }

    /// The outermost class around `id`, which owns the imports.
    fn top_level_class_of(&self, id: SymbolId) -> Option<SymbolId> {
        let mut found = None;
        let mut current = Some(id);
        while let Some(here) = current {
            let symbol = self.symbol(here)?;
            if symbol.kind.is_type() {
                found = Some(here);
            }
            current = symbol.enclosing;
        }
        return found;
    }

    /// Whether `outer` is `inner` or one of its enclosing symbols.
    fn encloses_or_same(&self, outer: SymbolId, inner: SymbolId) -> bool {
        let mut current = Some(inner);
        while let Some(here) = current {
            if here == outer {
                return true;
            }
            current = self.enclosing(here);
        }
        return false;
    }

    /// Direct supertypes that are declared in this table: superclass first.
    fn supertypes(&self, id: SymbolId) -> Vec<SymbolId> {
        let Some(symbol) = self.symbol(id) else {
            return Vec::new();
        };
        return symbol
            .superclass
            .iter()
            .chain(&symbol.interfaces)
            .filter_map(|ty| {
                return match ty {
                    TypeRef::Declared { symbol, .. } => Some(*symbol),
                    _ => None,
                };
            })
            .collect();
    }

    /// Erasure of a declared type.
    fn erasure(&self, ty: &TypeRef) -> ErasedType {
        return erase(self, ty, &mut Vec::new());
    }

    /// Erasures of an executable's formal parameters.
    fn erased_parameters(&self, id: SymbolId) -> Vec<ErasedType> {
        return self.symbol(id).map_or_else(Vec::new, |symbol| {
            return symbol.parameters.iter().map(|p| return self.erasure(&p.ty)).collect();
        });
    }

    /// The method `method` overrides: the first method with the same name and
    /// erased parameters met in a breadth-first walk of the supertypes.
    fn overridden(&self, method: SymbolId) -> Option<SymbolId> {
        let symbol = self.symbol(method)?;
        if symbol.kind != SymbolKind::Method || symbol.is_static {
            return None;
        }
        let erased = self.erased_parameters(method);
        let start = symbol.enclosing?;
        let mut seen = HashSet::from([start]);
        let mut queue: VecDeque<SymbolId> = self.supertypes(start).into();
        while let Some(class) = queue.pop_front() {
            if !seen.insert(class) {
                continue;
            }
            let Some(candidate_class) = self.symbol(class) else {
                continue;
            };
            let found = candidate_class.members.iter().copied().find(|&m| {
                return self.symbol(m).is_some_and(|candidate| {
                    return candidate.kind == SymbolKind::Method
                        && candidate.name == symbol.name
                        && self.erased_parameters(m) == erased;
                });
            });
            if found.is_some() {
                return found;
            }
            queue.extend(self.supertypes(class));
        }
        return None;
    }
}

/// Whether two types denote the same type.
///
/// Must be reflexive, symmetric and stable for one rendering pass.
pub trait TypeIdentity: Send + Sync {
    /// Compare two types.
    fn same_type(&self, a: &TypeRef, b: &TypeRef) -> bool;
}

/// Erase `ty`, tracking variables already passed through so that cyclic
/// bounds terminate at the root class.
fn erase<T: SymbolTable + ?Sized>(table: &T, ty: &TypeRef, visiting: &mut Vec<TypeVarId>) -> ErasedType {
    let root = || {
        return ErasedType {
            dimensions: 0,
            known: table.class_named(ROOT_CLASS).is_some(),
            name: ROOT_CLASS.to_string(),
        };
    };
    return match ty {
        TypeRef::Array(component) => {
            let mut inner = erase(table, component, visiting);
            inner.dimensions = inner.dimensions.saturating_add(1);
            inner
        },
        TypeRef::Declared { symbol, .. } => match table.symbol(*symbol) {
            Some(class) => ErasedType { dimensions: 0, known: true, name: class.qualified_name.clone() },
            None => root(),
        },
        TypeRef::Primitive(name) => ErasedType { dimensions: 0, known: true, name: name.clone() },
        TypeRef::Unresolved(name) => ErasedType { dimensions: 0, known: false, name: name.clone() },
        TypeRef::Variable(var) => {
            if visiting.contains(var) {
                return root();
            }
            visiting.push(*var);
            let bound = table.type_variable(*var).and_then(|tv| return tv.bounds.first());
            match bound {
                Some(bound) => erase(table, bound, visiting),
                None => root(),
            }
        },
        TypeRef::Wildcard { upper, .. } => match upper {
            Some(bound) => erase(table, bound, visiting),
            None => root(),
        },
    };
}

// ── Graph ───────────────────────────────────────────────────────────

/// A symbol universe loaded from a JSON graph file. Immutable once built.
#[derive(Debug, Default)]
pub struct Graph {
    /// Classes by qualified name.
    classes: HashMap<String, SymbolId>,
    /// Packages visible without import.
    implicit_packages: Vec<String>,
    /// Modules by name.
    modules: HashMap<String, SymbolId>,
    /// Packages by name.
    packages: HashMap<String, SymbolId>,
    /// All symbols, indexed by `SymbolId`.
    symbols: Vec<Symbol>,
    /// All type variables, indexed by `TypeVarId`.
    type_variables: Vec<TypeVariable>,
}

impl SymbolTable for Graph {
    fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        return self.symbols.get(usize::try_from(id.0).ok()?);
    }

    fn type_variable(&self, id: TypeVarId) -> Option<&TypeVariable> {
        return self.type_variables.get(usize::try_from(id.0).ok()?);
    }

    fn module_named(&self, name: &str) -> Option<SymbolId> {
        return self.modules.get(name).copied();
    }

    fn package_named(&self, name: &str) -> Option<SymbolId> {
        return self.packages.get(name).copied();
    }

    fn class_named(&self, qualified: &str) -> Option<SymbolId> {
        return self.classes.get(qualified).copied();
    }

    fn implicit_packages(&self) -> &[String] {
        return &self.implicit_packages;
    }
}

impl TypeIdentity for Graph {
    /// Structural equality. Type variables are equal only to themselves.
    fn same_type(&self, a: &TypeRef, b: &TypeRef) -> bool {
        return a == b;
    }
}

impl Graph {
    /// Read and build a graph from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::Json` if
    /// it is not valid JSON of the expected shape, or `Error::GraphInvalid`
    /// if it is inconsistent.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::from_json(&text);
    }

    /// Build a graph from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` for malformed JSON or `Error::GraphInvalid` for
    /// duplicate names, bad kinds or unparseable type expressions.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let raw: RawGraph = serde_json::from_str(text)?;
        let mut builder = Builder { graph: Self::default(), jobs: Vec::new() };
        builder.graph.implicit_packages = raw.implicit_packages;

        for module in &raw.modules {
            builder.add_module(module)?;
        }
        for package in &raw.packages {
            builder.add_package(&package.name, package.module.as_deref(), package.doc.as_deref(), package.external)?;
        }
        for class in &raw.classes {
            let Some(package_name) = class.package.as_deref() else {
                return Err(Error::GraphInvalid {
                    reason: format!("top-level class `{}` has no package", class.name),
                });
            };
            let package = match builder.graph.package_named(package_name) {
                Some(id) => id,
                None => builder.add_package(package_name, None, None, class.external)?,
            };
            builder.add_class(class, package, None)?;
        }

        builder.place_types()?;
        builder.check_acyclic()?;
        builder.name_members();
        let graph = builder.graph;
        tracing::debug!(symbols = graph.symbols.len(), classes = graph.classes.len(), "symbol graph loaded");
        return Ok(graph);
    }

    /// Every symbol in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        return &self.symbols;
    }

    /// Any symbol by its unique qualified name: module, package, class, or
    /// member (`pkg.C#m(int)`, `pkg.C#field`).
    pub fn find_by_qualified_name(&self, name: &str) -> Option<SymbolId> {
        return self
            .class_named(name)
            .or_else(|| return self.package_named(name))
            .or_else(|| return self.module_named(name))
            .or_else(|| {
                return self
                    .symbols
                    .iter()
                    .find(|s| return !s.kind.is_type() && s.qualified_name == name)
                    .map(|s| return s.id);
            });
    }

    /// Type variable named `name` visible from `scope`: the scope's own,
    /// then those of its enclosing executables and classes.
    fn type_variable_in_scope(&self, scope: SymbolId, name: &str) -> Option<TypeVarId> {
        let mut current = Some(scope);
        while let Some(here) = current {
            let symbol = self.symbol(here)?;
            let found = symbol
                .type_parameters
                .iter()
                .copied()
                .find(|&tv| return self.type_variable(tv).is_some_and(|v| return v.name == name));
            if found.is_some() {
                return found;
            }
            current = symbol.enclosing;
        }
        return None;
    }

    /// Place a parsed type expression against this graph from `scope`.
    fn place(&self, expr: &TypeExpr, scope: SymbolId) -> TypeRef {
        return match expr {
            TypeExpr::Array(component) => TypeRef::Array(Box::new(self.place(component, scope))),
            TypeExpr::Wildcard { lower, upper } => TypeRef::Wildcard {
                lower: lower.as_ref().map(|t| return Box::new(self.place(t, scope))),
                upper: upper.as_ref().map(|t| return Box::new(self.place(t, scope))),
            },
            TypeExpr::Named { args, name } => {
                if args.is_empty() && is_primitive(name) {
                    return TypeRef::Primitive(name.clone());
                }
                if let Some(var) = expr.as_simple_name().and_then(|n| return self.type_variable_in_scope(scope, n)) {
                    return TypeRef::Variable(var);
                }
                match resolver::find_class(self, Some(scope), name) {
                    Some(symbol) => TypeRef::Declared {
                        args: args.iter().map(|a| return self.place(a, scope)).collect(),
                        symbol,
                    },
                    None => TypeRef::Unresolved(name.clone()),
                }
            },
        };
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Raw JSON shape of a graph file.
#[derive(serde::Deserialize)]
struct RawGraph {
    /// Top-level classes.
    #[serde(default)]
    classes: Vec<RawClass>,
    /// Packages visible without import.
    #[serde(default = "default_implicit_packages")]
    implicit_packages: Vec<String>,
    /// Modules.
    #[serde(default)]
    modules: Vec<RawModule>,
    /// Packages. Packages named only by classes are created implicitly.
    #[serde(default)]
    packages: Vec<RawPackage>,
}

/// `java.lang` is always in scope.
fn default_implicit_packages() -> Vec<String> {
    return vec!["java.lang".to_string()];
}

/// Raw module entry.
#[derive(serde::Deserialize)]
struct RawModule {
    /// Documentation comment.
    doc: Option<String>,
    /// Exported package names.
    #[serde(default)]
    exports: Vec<String>,
    /// Declared outside the documented universe.
    #[serde(default)]
    external: bool,
    /// Qualified name.
    name: String,
}

/// Raw package entry.
#[derive(serde::Deserialize)]
struct RawPackage {
    /// Documentation comment.
    doc: Option<String>,
    /// Declared outside the documented universe.
    #[serde(default)]
    external: bool,
    /// Owning module.
    module: Option<String>,
    /// Qualified name.
    name: String,
}

/// Raw class entry, top-level or nested.
#[derive(serde::Deserialize)]
struct RawClass {
    /// Nested classes.
    #[serde(default)]
    classes: Vec<RawClass>,
    /// Enum constants.
    #[serde(default)]
    constants: Vec<RawField>,
    /// Constructors.
    #[serde(default)]
    constructors: Vec<RawExecutable>,
    /// Documentation comment.
    doc: Option<String>,
    /// Declared outside the documented universe.
    #[serde(default)]
    external: bool,
    /// Fields.
    #[serde(default)]
    fields: Vec<RawField>,
    /// Single-type (or `pkg.*`) imports of a top-level class.
    #[serde(default)]
    imports: Vec<String>,
    /// Interfaces implemented or extended.
    #[serde(default)]
    interfaces: Vec<String>,
    /// Static nested class.
    #[serde(default, rename = "static")]
    is_static: bool,
    /// Class, interface, enum or annotation.
    #[serde(default = "default_class_kind")]
    kind: SymbolKind,
    /// Methods.
    #[serde(default)]
    methods: Vec<RawExecutable>,
    /// Simple name.
    name: String,
    /// Package of a top-level class.
    package: Option<String>,
    /// Superclass type expression.
    superclass: Option<String>,
    /// Type parameters.
    #[serde(default)]
    type_parameters: Vec<RawTypeParameter>,
}

/// Classes are the default kind.
const fn default_class_kind() -> SymbolKind {
    return SymbolKind::Class;
}

/// Raw field or enum constant.
#[derive(serde::Deserialize)]
struct RawField {
    /// Documentation comment.
    doc: Option<String>,
    /// Static field.
    #[serde(default, rename = "static")]
    is_static: bool,
    /// Simple name.
    name: String,
    /// Type expression; enum constants omit it.
    #[serde(rename = "type")]
    ty: Option<String>,
}

/// Raw constructor or method.
#[derive(serde::Deserialize)]
struct RawExecutable {
    /// Documentation comment.
    doc: Option<String>,
    /// Static method.
    #[serde(default, rename = "static")]
    is_static: bool,
    /// Method name; constructors omit it.
    name: Option<String>,
    /// Formal parameters.
    #[serde(default)]
    parameters: Vec<RawParam>,
    /// Return type expression; defaults to `void`.
    returns: Option<String>,
    /// Type parameters.
    #[serde(default)]
    type_parameters: Vec<RawTypeParameter>,
}

/// Raw formal parameter.
#[derive(serde::Deserialize)]
struct RawParam {
    /// Declared name.
    name: String,
    /// Type expression; a trailing `...` marks varargs.
    #[serde(rename = "type")]
    ty: String,
}

/// Raw type parameter.
#[derive(serde::Deserialize)]
struct RawTypeParameter {
    /// Upper bounds.
    #[serde(default)]
    bounds: Vec<String>,
    /// Simple name.
    name: String,
}

/// Where a placed type goes once every class name is known.
enum Slot {
    /// A type variable's next bound.
    Bound(TypeVarId),
    /// A class's next interface.
    Interface(SymbolId),
    /// An executable's parameter at this position.
    Param(SymbolId, usize),
    /// A method's return type.
    Returns(SymbolId),
    /// A class's superclass.
    Superclass(SymbolId),
    /// A field's type.
    Value(SymbolId),
}

/// A type expression waiting to be placed.
struct Job {
    /// Symbol whose scope names are looked up from.
    scope: SymbolId,
    /// Destination.
    slot: Slot,
    /// Text as written in the file.
    text: String,
}

/// Two-pass graph construction: allocate symbols, then place types.
struct Builder {
    /// The graph under construction.
    graph: Graph,
    /// Types to place once all classes exist.
    jobs: Vec<Job>,
}

impl Builder {
    /// Append a symbol with empty relations.
    fn push(
        &mut self,
        kind: SymbolKind,
        name: &str,
        qualified_name: String,
        enclosing: Option<SymbolId>,
        doc: Option<&str>,
    ) -> Result<SymbolId, Error> {
        let id = SymbolId(u32::try_from(self.graph.symbols.len()).map_err(|_| {
            return Error::GraphInvalid { reason: "too many symbols".to_string() };
        })?);
        self.graph.symbols.push(Symbol {
            doc: doc.map(DocComment::parse),
            enclosing,
            exported: true,
            exports: Vec::new(),
            external: false,
            id,
            imports: Vec::new(),
            interfaces: Vec::new(),
            is_static: false,
            kind,
            members: Vec::new(),
            name: name.to_string(),
            parameters: Vec::new(),
            qualified_name,
            returns: None,
            superclass: None,
            type_parameters: Vec::new(),
            value_type: None,
            varargs: false,
        });
        if let Some(parent) = enclosing.and_then(|p| return self.symbol_mut(p)) {
            parent.members.push(id);
        }
        return Ok(id);
    }

    /// Mutable access during construction.
    fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        return self.graph.symbols.get_mut(usize::try_from(id.0).ok()?);
    }

    /// Register a module.
    fn add_module(&mut self, raw: &RawModule) -> Result<SymbolId, Error> {
        if self.graph.modules.contains_key(&raw.name) {
            return Err(Error::GraphInvalid { reason: format!("duplicate module `{}`", raw.name) });
        }
        let id = self.push(SymbolKind::Module, &raw.name, raw.name.clone(), None, raw.doc.as_deref())?;
        if let Some(symbol) = self.symbol_mut(id) {
            symbol.external = raw.external;
            symbol.exports.clone_from(&raw.exports);
        }
        self.graph.modules.insert(raw.name.clone(), id);
        return Ok(id);
    }

    /// Register a package, linking it to its module. Export status comes
    /// from the module's export list; packages outside any module are open.
    fn add_package(
        &mut self,
        name: &str,
        module: Option<&str>,
        doc: Option<&str>,
        external: bool,
    ) -> Result<SymbolId, Error> {
        if self.graph.packages.contains_key(name) {
            return Err(Error::GraphInvalid { reason: format!("duplicate package `{name}`") });
        }
        let module_id = match module {
            Some(m) => Some(self.graph.module_named(m).ok_or_else(|| {
                return Error::GraphInvalid { reason: format!("package `{name}` names unknown module `{m}`") };
            })?),
            None => None,
        };
        let exported = module_id
            .and_then(|m| return self.graph.symbol(m))
            .is_none_or(|m| return m.exports.iter().any(|e| return e == name));
        let id = self.push(SymbolKind::Package, name, name.to_string(), module_id, doc)?;
        if let Some(symbol) = self.symbol_mut(id) {
            symbol.exported = exported;
            symbol.external = external;
        }
        self.graph.packages.insert(name.to_string(), id);
        return Ok(id);
    }

    /// Allocate a type variable owned by `owner` and queue its bounds.
    fn add_type_parameters(&mut self, owner: SymbolId, raw: &[RawTypeParameter]) -> Result<(), Error> {
        for tp in raw {
            let id = TypeVarId(u32::try_from(self.graph.type_variables.len()).map_err(|_| {
                return Error::GraphInvalid { reason: "too many type variables".to_string() };
            })?);
            self.graph.type_variables.push(TypeVariable { bounds: Vec::new(), name: tp.name.clone(), owner });
            if let Some(symbol) = self.symbol_mut(owner) {
                symbol.type_parameters.push(id);
            }
            for bound in &tp.bounds {
                self.jobs.push(Job { scope: owner, slot: Slot::Bound(id), text: bound.clone() });
            }
        }
        return Ok(());
    }

    /// Register a class and everything it declares.
    fn add_class(&mut self, raw: &RawClass, package: SymbolId, outer: Option<SymbolId>) -> Result<SymbolId, Error> {
        if !raw.kind.is_type() {
            return Err(Error::GraphInvalid {
                reason: format!("class `{}` has non-type kind `{}`", raw.name, raw.kind),
            });
        }
        let prefix_id = outer.unwrap_or(package);
        let prefix = self.graph.symbol(prefix_id).map(|s| return s.qualified_name.clone()).unwrap_or_default();
        let qualified = if prefix.is_empty() { raw.name.clone() } else { format!("{prefix}.{}", raw.name) };
        if self.graph.classes.contains_key(&qualified) {
            return Err(Error::GraphInvalid { reason: format!("duplicate class `{qualified}`") });
        }

        let external = raw.external || outer.and_then(|o| return self.graph.symbol(o)).is_some_and(|o| return o.external);
        let id = self.push(raw.kind, &raw.name, qualified.clone(), Some(prefix_id), raw.doc.as_deref())?;
        self.graph.classes.insert(qualified.clone(), id);
        if let Some(symbol) = self.symbol_mut(id) {
            symbol.external = external;
            symbol.imports.clone_from(&raw.imports);
            symbol.is_static = raw.is_static;
        }
        self.add_type_parameters(id, &raw.type_parameters)?;
        if let Some(superclass) = &raw.superclass {
            self.jobs.push(Job { scope: id, slot: Slot::Superclass(id), text: superclass.clone() });
        }
        for interface in &raw.interfaces {
            self.jobs.push(Job { scope: id, slot: Slot::Interface(id), text: interface.clone() });
        }

        for field in &raw.fields {
            let field_id = self.add_member(SymbolKind::Field, &field.name, id, field.doc.as_deref(), external)?;
            if let Some(symbol) = self.symbol_mut(field_id) {
                symbol.is_static = field.is_static;
            }
            let text = field.ty.clone().ok_or_else(|| {
                return Error::GraphInvalid { reason: format!("field `{qualified}#{}` has no type", field.name) };
            })?;
            self.jobs.push(Job { scope: id, slot: Slot::Value(field_id), text });
        }
        for constant in &raw.constants {
            let constant_id = self.add_member(SymbolKind::EnumConstant, &constant.name, id, constant.doc.as_deref(), external)?;
            if let Some(symbol) = self.symbol_mut(constant_id) {
                symbol.is_static = true;
                symbol.value_type = Some(TypeRef::Declared { args: Vec::new(), symbol: id });
            }
        }
        for ctor in &raw.constructors {
            let ctor_id = self.add_member(SymbolKind::Constructor, &raw.name, id, ctor.doc.as_deref(), external)?;
            self.add_executable_types(ctor_id, ctor)?;
        }
        for method in &raw.methods {
            let name = method.name.as_deref().ok_or_else(|| {
                return Error::GraphInvalid { reason: format!("unnamed method in `{qualified}`") };
            })?;
            let method_id = self.add_member(SymbolKind::Method, name, id, method.doc.as_deref(), external)?;
            if let Some(symbol) = self.symbol_mut(method_id) {
                symbol.is_static = method.is_static;
            }
            self.add_executable_types(method_id, method)?;
            let returns = method.returns.clone().unwrap_or_else(|| return "void".to_string());
            self.jobs.push(Job { scope: method_id, slot: Slot::Returns(method_id), text: returns });
        }
        for nested in &raw.classes {
            self.add_class(nested, package, Some(id))?;
        }
        return Ok(id);
    }

    /// Register a field, constant or executable. Executables get their final
    /// qualified name once parameter types are placed.
    fn add_member(
        &mut self,
        kind: SymbolKind,
        name: &str,
        class: SymbolId,
        doc: Option<&str>,
        external: bool,
    ) -> Result<SymbolId, Error> {
        let class_name = self.graph.symbol(class).map(|s| return s.qualified_name.clone()).unwrap_or_default();
        let id = self.push(kind, name, format!("{class_name}#{name}"), Some(class), doc)?;
        if let Some(symbol) = self.symbol_mut(id) {
            symbol.external = external;
        }
        return Ok(id);
    }

    /// Queue parameter types and register type parameters of an executable.
    fn add_executable_types(&mut self, id: SymbolId, raw: &RawExecutable) -> Result<(), Error> {
        self.add_type_parameters(id, &raw.type_parameters)?;
        if let Some(symbol) = self.symbol_mut(id) {
            symbol.parameters = raw
                .parameters
                .iter()
                .map(|p| return Param { name: p.name.clone(), ty: TypeRef::Unresolved(p.ty.clone()) })
                .collect();
        }
        for (position, param) in raw.parameters.iter().enumerate() {
            self.jobs.push(Job { scope: id, slot: Slot::Param(id, position), text: param.ty.clone() });
        }
        return Ok(());
    }

    /// Parse and place every queued type expression.
    fn place_types(&mut self) -> Result<(), Error> {
        let jobs = std::mem::take(&mut self.jobs);
        let mut placed = Vec::with_capacity(jobs.len());
        for job in jobs {
            let parsed = typeexpr::parse_type(&job.text)?;
            let ty = self.graph.place(&parsed.expr, job.scope);
            placed.push((job.slot, ty, parsed.varargs));
        }

        for (slot, ty, varargs) in placed {
            match slot {
                Slot::Bound(var) => {
                    let index = usize::try_from(var.0).ok();
                    if let Some(tv) = index.and_then(|i| return self.graph.type_variables.get_mut(i)) {
                        tv.bounds.push(ty);
                    }
                },
                Slot::Interface(id) => {
                    if let Some(symbol) = self.symbol_mut(id) {
                        symbol.interfaces.push(ty);
                    }
                },
                Slot::Param(id, position) => {
                    if let Some(symbol) = self.symbol_mut(id) {
                        let last = symbol.parameters.len().saturating_sub(1);
                        if let Some(param) = symbol.parameters.get_mut(position) {
                            param.ty = ty;
                        }
                        if varargs {
                            if position != last {
                                return Err(Error::GraphInvalid {
                                    reason: format!("`{}` has varargs before its last parameter", symbol.qualified_name),
                                });
                            }
                            symbol.varargs = true;
                        }
                    }
                },
                Slot::Returns(id) => {
                    if let Some(symbol) = self.symbol_mut(id) {
                        symbol.returns = Some(ty);
                    }
                },
                Slot::Superclass(id) => {
                    if let Some(symbol) = self.symbol_mut(id) {
                        symbol.superclass = Some(ty);
                    }
                },
                Slot::Value(id) => {
                    if let Some(symbol) = self.symbol_mut(id) {
                        symbol.value_type = Some(ty);
                    }
                },
            }
        }
        return Ok(());
    }

    /// Reject classes that are their own supertype.
    fn check_acyclic(&self) -> Result<(), Error> {
        for class in self.graph.symbols.iter().filter(|s| return s.kind.is_type()) {
            let mut seen = HashSet::new();
            let mut queue: VecDeque<SymbolId> = self.graph.supertypes(class.id).into();
            while let Some(next) = queue.pop_front() {
                if next == class.id {
                    return Err(Error::GraphInvalid {
                        reason: format!("`{}` inherits from itself", class.qualified_name),
                    });
                }
                if seen.insert(next) {
                    queue.extend(self.graph.supertypes(next));
                }
            }
        }
        return Ok(());
    }

    /// Give executables their `Class#name(erased,params)` qualified names.
    fn name_members(&mut self) {
        let renames: Vec<(SymbolId, String)> = self
            .graph
            .symbols
            .iter()
            .filter(|s| return s.kind.is_executable())
            .map(|s| {
                let params: Vec<String> = self
                    .graph
                    .erased_parameters(s.id)
                    .iter()
                    .map(|e| return e.to_string())
                    .collect();
                return (s.id, format!("{}({})", s.qualified_name, params.join(",")));
            })
            .collect();
        for (id, name) in renames {
            if let Some(symbol) = self.symbol_mut(id) {
                symbol.qualified_name = name;
            }
        }
        return;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
pub(crate) mod tests {
    use super::*;

    /// A small universe shared by tests across modules.
    pub(crate) const SAMPLE: &str = r#"{
      "modules": [{"name": "demo.core", "exports": ["demo.util"]}],
      "packages": [
        {"name": "demo.util", "module": "demo.core", "doc": "Utilities."},
        {"name": "demo.internal", "module": "demo.core"},
        {"name": "java.lang", "external": true},
        {"name": "java.util", "external": true}
      ],
      "classes": [
        {"name": "Object", "package": "java.lang", "external": true},
        {"name": "String", "package": "java.lang", "external": true},
        {"name": "Comparable", "package": "java.lang", "kind": "interface", "external": true,
         "type_parameters": [{"name": "T"}]},
        {"name": "List", "package": "java.util", "kind": "interface", "external": true,
         "type_parameters": [{"name": "E"}]},
        {"name": "Box", "package": "demo.util",
         "imports": ["java.util.List"],
         "doc": "A box of {@link Item items}. Holds one value.",
         "type_parameters": [{"name": "T", "bounds": ["Comparable<T>"]}],
         "fields": [{"name": "size", "type": "int", "doc": "Current size."}],
         "constructors": [{"parameters": [{"name": "value", "type": "T"}]}],
         "methods": [
           {"name": "get", "returns": "T", "doc": "Returns the value.\n@return the {@code value}"},
           {"name": "put", "parameters": [{"name": "values", "type": "int[]"}]},
           {"name": "put", "parameters": [{"name": "values", "type": "int[][]"}]},
           {"name": "all", "returns": "List<T>", "parameters": [{"name": "names", "type": "String..."}]},
           {"name": "describe", "returns": "String", "parameters": [{"name": "depth", "type": "int"}],
            "doc": "{@inheritDoc} Boxes say more.\n@param depth {@inheritDoc}\n@return {@inheritDoc}\n@throws IllegalStateException {@inheritDoc}"}
         ],
         "superclass": "Base",
         "interfaces": ["Comparable<Box<T>>"],
         "classes": [
           {"name": "Entry", "static": true, "fields": [{"name": "key", "type": "String"}]}
         ]},
        {"name": "Base", "package": "demo.util",
         "methods": [
           {"name": "describe", "returns": "String", "parameters": [{"name": "level", "type": "int"}],
            "doc": "Describes this thing. In detail.\n@param level how deep to go\n@return the description\n@throws IllegalStateException if closed"}
         ]},
        {"name": "Item", "package": "demo.util", "kind": "enum",
         "constants": [{"name": "RED"}, {"name": "BLUE"}]},
        {"name": "Hidden", "package": "demo.internal"}
      ]
    }"#;

    pub(crate) fn sample() -> Graph {
        Graph::from_json(SAMPLE).unwrap()
    }

    #[test]
    fn classes_and_members_are_indexed() {
        let g = sample();
        let boxed = g.class_named("demo.util.Box").unwrap();
        let entry = g.class_named("demo.util.Box.Entry").unwrap();
        assert_eq!(g.enclosing(entry), Some(boxed));
        assert_eq!(g.package_of(entry), g.package_named("demo.util"));
        assert_eq!(g.top_level_class_of(entry), Some(boxed));
        assert!(g.encloses_or_same(boxed, entry));
        assert!(!g.encloses_or_same(entry, boxed));
    }

    #[test]
    fn executables_are_named_by_erasure() {
        let g = sample();
        assert!(g.find_by_qualified_name("demo.util.Box#put(int[])").is_some());
        assert!(g.find_by_qualified_name("demo.util.Box#put(int[][])").is_some());
        assert!(g.find_by_qualified_name("demo.util.Box#all(java.lang.String[])").is_some());
        // T erases to its first bound.
        assert!(g.find_by_qualified_name("demo.util.Box#Box(java.lang.Comparable)").is_some());
    }

    #[test]
    fn varargs_and_type_variables_are_placed() {
        let g = sample();
        let all = g.find_by_qualified_name("demo.util.Box#all(java.lang.String[])").unwrap();
        assert!(g.symbol(all).unwrap().varargs);
        let get = g.find_by_qualified_name("demo.util.Box#get()").unwrap();
        assert!(matches!(g.symbol(get).unwrap().returns, Some(TypeRef::Variable(_))));
    }

    #[test]
    fn module_exports() {
        let g = sample();
        let util = g.symbol(g.package_named("demo.util").unwrap()).unwrap();
        let internal = g.symbol(g.package_named("demo.internal").unwrap()).unwrap();
        assert!(util.exported);
        assert!(!internal.exported);
        assert_eq!(util.enclosing, g.module_named("demo.core"));
        let module = g.symbol(g.module_named("demo.core").unwrap()).unwrap();
        assert_eq!(module.exports, vec!["demo.util".to_string()]);
        assert!(module.imports.is_empty());
    }

    #[test]
    fn overridden_walks_supertypes() {
        let g = Graph::from_json(
            r#"{"classes": [
              {"name": "Base", "package": "p", "methods": [{"name": "run", "parameters": [{"name": "n", "type": "int"}]}]},
              {"name": "Mid", "package": "p", "superclass": "Base"},
              {"name": "Leaf", "package": "p", "superclass": "Mid",
               "methods": [{"name": "run", "parameters": [{"name": "n", "type": "int"}]},
                           {"name": "run", "parameters": [{"name": "n", "type": "long"}]}]}
            ]}"#,
        )
        .unwrap();
        let leaf_run = g.find_by_qualified_name("p.Leaf#run(int)").unwrap();
        let base_run = g.find_by_qualified_name("p.Base#run(int)").unwrap();
        assert_eq!(g.overridden(leaf_run), Some(base_run));
        let leaf_long = g.find_by_qualified_name("p.Leaf#run(long)").unwrap();
        assert_eq!(g.overridden(leaf_long), None);
    }

    #[test]
    fn cyclic_bounds_erase_to_root() {
        let g = Graph::from_json(
            r#"{"classes": [{"name": "C", "package": "p", "type_parameters": [
              {"name": "A", "bounds": ["B"]}, {"name": "B", "bounds": ["C2"]}, {"name": "C2", "bounds": ["A"]}],
              "methods": [{"name": "m", "parameters": [{"name": "a", "type": "A"}]}]}]}"#,
        )
        .unwrap();
        assert!(g.find_by_qualified_name("p.C#m(java.lang.Object)").is_some());
    }

    #[test]
    fn malformed_graphs_are_rejected() {
        assert!(Graph::from_json(r#"{"classes": [{"name": "A"}]}"#).is_err());
        assert!(Graph::from_json(r#"{"classes": [{"name": "A", "package": "p", "superclass": "List<"}]}"#).is_err());
        assert!(
            Graph::from_json(r#"{"classes": [{"name": "A", "package": "p"}, {"name": "A", "package": "p"}]}"#).is_err()
        );
        let cyclic = r#"{"classes": [{"name": "A", "package": "p", "superclass": "B"},
                                      {"name": "B", "package": "p", "superclass": "A"}]}"#;
        assert!(matches!(Graph::from_json(cyclic), Err(Error::GraphInvalid { .. })));
    }
}
