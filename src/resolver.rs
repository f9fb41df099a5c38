//! Matching parsed signatures against the symbol table.
//!
//! Resolution is deterministic: the same signature, source context and table
//! always produce the same result, and ties are reported, never broken.

use std::collections::{HashSet, VecDeque};

use crate::error::{ResolutionError, UnresolvedReason};
use crate::locate::Locator;
use crate::signature::{Parameter, Signature};
use crate::source_context::SourceContext;
use crate::symbols::SymbolTable;
use crate::types::{ErasedType, ResolvedReference, Symbol, SymbolId, SymbolKind, is_primitive};

/// Which reading wins when a dotted path names both a package and a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathPrecedence {
    /// Prefer the class; fall back to the package.
    ClassFirst,
    /// Prefer the package; fall back to the class.
    #[default]
    PackageFirst,
}

/// Knobs that change what a signature resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Search supertypes when the named class lacks the member.
    pub inherited_members: bool,
    /// Precedence for exact dotted paths.
    pub path_precedence: PathPrecedence,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        return Self { inherited_members: true, path_precedence: PathPrecedence::PackageFirst };
    }
}

/// What a dotted path turned out to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Found {
    /// A class.
    Class(SymbolId),
    /// A package.
    Package(SymbolId),
}

/// Resolves signatures against one table, locating targets through one locator.
#[derive(Clone)]
pub struct Resolver<'a> {
    /// Destination lookup for resolved targets.
    locator: &'a dyn Locator,
    /// Resolution knobs.
    options: ResolveOptions,
    /// Symbol universe.
    table: &'a dyn SymbolTable,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.debug_struct("Resolver").field("options", &self.options).finish_non_exhaustive();
    }
}

impl<'a> Resolver<'a> {
    /// Resolver over `table`, locating results with `locator`.
    pub fn new(table: &'a dyn SymbolTable, locator: &'a dyn Locator, options: ResolveOptions) -> Self {
        return Self { locator, options, table };
    }

    /// The symbol table being searched.
    pub fn table(&self) -> &'a dyn SymbolTable {
        return self.table;
    }

    /// Resolve `signature` as written in the documentation of `context`'s subject.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError::Unresolved` when no symbol matches, or
    /// `ResolutionError::Ambiguous` when several executables match the
    /// given parameter list.
    pub fn resolve(&self, signature: &Signature, context: &SourceContext) -> Result<ResolvedReference, ResolutionError> {
        let subject = context.subject();
        let unresolved = |reason: UnresolvedReason| {
            return ResolutionError::Unresolved {
                context: self.describe(subject),
                reason,
                signature: signature.to_string(),
            };
        };

        let module = match &signature.module {
            Some(name) => Some(self.table.module_named(name).ok_or_else(|| return unresolved(UnresolvedReason::NoSuchModule))?),
            None => None,
        };

        let target = match (&signature.package_or_class, &signature.member) {
            (None, None) => match module {
                Some(module) => module,
                None => return Err(unresolved(UnresolvedReason::NoSuchPackageOrClass)),
            },
            (Some(path), None) => match self.find_package_or_class(path, subject, module) {
                Some(Found::Class(id) | Found::Package(id)) => id,
                None => return Err(unresolved(UnresolvedReason::NoSuchPackageOrClass)),
            },
            (path, Some(member)) => {
                let class = match path {
                    Some(path) => match self.find_package_or_class(path, subject, module) {
                        Some(Found::Class(id)) => id,
                        Some(Found::Package(id)) => {
                            return Err(unresolved(UnresolvedReason::MemberOfNonClass {
                                container: self.describe(Some(id)),
                            }));
                        },
                        None => return Err(unresolved(UnresolvedReason::NoSuchPackageOrClass)),
                    },
                    None => subject
                        .and_then(|s| return self.table.class_of(s))
                        .ok_or_else(|| return unresolved(UnresolvedReason::NoEnclosingClass))?,
                };
                self.find_member(class, member, signature, subject)?
            },
        };

        let resolved = self.reference_to(target);
        tracing::debug!(
            signature = %signature,
            context = %self.describe(subject),
            target = %self.describe(Some(target)),
            "resolved reference"
        );
        return Ok(resolved);
    }

    /// Qualified name of a symbol, for messages.
    fn describe(&self, id: Option<SymbolId>) -> String {
        return id
            .and_then(|id| return self.table.symbol(id))
            .map_or_else(|| return "<no element>".to_string(), |s| return s.qualified_name.clone());
    }

    /// A resolved reference to a known symbol: the narrowest combination of
    /// fields for `target`, or only a location for an external symbol.
    pub fn reference_to(&self, target: SymbolId) -> ResolvedReference {
        let location = self.locator.locate(target);
        let Some(symbol) = self.table.symbol(target) else {
            return ResolvedReference { location, ..ResolvedReference::default() };
        };
        if symbol.external {
            return ResolvedReference { location, ..ResolvedReference::default() };
        }
        let mut out = ResolvedReference { location, ..ResolvedReference::default() };
        match symbol.kind {
            SymbolKind::Module => out.module = Some(target),
            SymbolKind::Package => out.package = Some(target),
            kind if kind.is_type() => {
                out.class = Some(target);
                out.package = self.table.package_of(target);
            },
            kind => {
                if kind.is_executable() {
                    out.executable = Some(target);
                } else {
                    out.field = Some(target);
                }
                out.class = symbol.enclosing;
                out.package = self.table.package_of(target);
            },
        }
        return out;
    }

    /// Whether `package` is visible under the module restriction.
    fn package_allowed(&self, package: SymbolId, module: Option<SymbolId>) -> bool {
        let Some(module) = module else {
            return true;
        };
        return self
            .table
            .symbol(package)
            .is_some_and(|p| return p.enclosing == Some(module) && p.exported);
    }

    /// Whether `class` is visible under the module restriction.
    fn class_allowed(&self, class: SymbolId, module: Option<SymbolId>) -> bool {
        if module.is_none() {
            return true;
        }
        return self
            .table
            .package_of(class)
            .is_some_and(|p| return self.package_allowed(p, module));
    }

    /// Exact package and exact class in configured precedence, then a class
    /// relative to the subject, then a subpackage of the subject's package.
    fn find_package_or_class(&self, path: &str, subject: Option<SymbolId>, module: Option<SymbolId>) -> Option<Found> {
        let exact_package = || {
            return self
                .table
                .package_named(path)
                .filter(|&p| return self.package_allowed(p, module))
                .map(Found::Package);
        };
        let exact_class = || {
            return self
                .table
                .class_named(path)
                .filter(|&c| return self.class_allowed(c, module))
                .map(Found::Class);
        };
        let relative_class = || {
            return subject
                .and_then(|s| return find_class_relative(self.table, s, path))
                .filter(|&c| return self.class_allowed(c, module))
                .map(Found::Class);
        };
        let relative_package = || {
            let package = self.table.symbol(self.table.package_of(subject?)?)?;
            return self
                .table
                .package_named(&format!("{}.{path}", package.name))
                .filter(|&p| return self.package_allowed(p, module))
                .map(Found::Package);
        };

        let exact = match self.options.path_precedence {
            PathPrecedence::PackageFirst => exact_package().or_else(exact_class),
            PathPrecedence::ClassFirst => exact_class().or_else(exact_package),
        };
        return exact.or_else(relative_class).or_else(relative_package);
    }

    /// The class and, when inherited members are on, its supertypes in
    /// breadth-first order.
    fn hierarchy(&self, class: SymbolId) -> Vec<SymbolId> {
        if !self.options.inherited_members {
            return vec![class];
        }
        return breadth_first_supertypes(self.table, class);
    }

    /// Find `name` in `class` and, when inherited members are on, its
    /// supertypes. Without parameters the nearest field wins, then a sole
    /// executable across the whole hierarchy (overrides counted once). With
    /// parameters the nearest level holding a match decides.
    fn find_member(
        &self,
        class: SymbolId,
        name: &str,
        signature: &Signature,
        subject: Option<SymbolId>,
    ) -> Result<SymbolId, ResolutionError> {
        let error = |reason: UnresolvedReason| {
            return ResolutionError::Unresolved {
                context: self.describe(subject),
                reason,
                signature: signature.to_string(),
            };
        };
        let levels: Vec<Vec<&Symbol>> = self
            .hierarchy(class)
            .into_iter()
            .map(|level| return self.named_members(level, name, level == class))
            .collect();

        let Some(params) = &signature.parameters else {
            if let Some(field) = levels.iter().flatten().find(|m| return m.kind.is_variable()) {
                return Ok(field.id);
            }
            let executables = self.distinct_executables(levels.iter().flatten().copied());
            return match executables.as_slice() {
                [] => Err(error(UnresolvedReason::NoSuchMember)),
                [only] => Ok(only.id),
                many => Err(error(UnresolvedReason::ParametersRequired { overloads: many.len() })),
            };
        };

        let wanted: Vec<ErasedType> = params.iter().map(|p| return self.erase_parameter(p, subject, class)).collect();
        for named in &levels {
            let matching: Vec<&&Symbol> = named
                .iter()
                .filter(|m| return m.kind.is_executable() && self.parameters_match(m.id, &wanted))
                .collect();
            match matching.as_slice() {
                [] => {},
                [only] => return Ok(only.id),
                many => {
                    return Err(ResolutionError::Ambiguous {
                        candidates: many.iter().map(|m| return m.qualified_name.clone()).collect(),
                        context: self.describe(subject),
                        signature: signature.to_string(),
                    });
                },
            }
        }
        return Err(error(UnresolvedReason::NoSuchMember));
    }

    /// Members of `level` called `name`. Constructors count only on the
    /// class being searched.
    fn named_members(&self, level: SymbolId, name: &str, searched: bool) -> Vec<&'a Symbol> {
        let Some(owner) = self.table.symbol(level) else {
            return Vec::new();
        };
        return owner
            .members
            .iter()
            .filter_map(|&m| return self.table.symbol(m))
            .filter(|m| return m.name == name)
            .filter(|m| return m.kind != SymbolKind::Constructor || searched)
            .collect();
    }

    /// Executables in hierarchy order, keeping only the nearest of those
    /// sharing an erased parameter list.
    fn distinct_executables<'s>(&self, members: impl Iterator<Item = &'s Symbol>) -> Vec<&'s Symbol> {
        let mut seen: HashSet<Vec<ErasedType>> = HashSet::new();
        return members
            .filter(|m| return m.kind.is_executable())
            .filter(|m| return seen.insert(self.table.erased_parameters(m.id)))
            .collect();
    }

    /// Erasure of a written parameter type, placed from the subject first
    /// and then from the class being searched.
    fn erase_parameter(&self, param: &Parameter, subject: Option<SymbolId>, class: SymbolId) -> ErasedType {
        let dimensions = param.total_dimensions();
        if is_primitive(&param.erased_type) {
            return ErasedType { dimensions, known: true, name: param.erased_type.clone() };
        }
        let placed = find_class(self.table, subject, &param.erased_type)
            .or_else(|| return find_class(self.table, Some(class), &param.erased_type))
            .and_then(|c| return self.table.symbol(c));
        return match placed {
            Some(class) => ErasedType { dimensions, known: true, name: class.qualified_name.clone() },
            None => ErasedType { dimensions, known: false, name: param.erased_type.clone() },
        };
    }

    /// Whether an executable's erased parameters match, position by position.
    fn parameters_match(&self, executable: SymbolId, wanted: &[ErasedType]) -> bool {
        let actual = self.table.erased_parameters(executable);
        return actual.len() == wanted.len() && actual.iter().zip(wanted).all(|(a, w)| return a.matches(w));
    }
}

// ── Class lookup ────────────────────────────────────────────────────

/// A class by exact qualified name, or else relative to `scope`.
pub fn find_class<T: SymbolTable + ?Sized>(table: &T, scope: Option<SymbolId>, path: &str) -> Option<SymbolId> {
    return table
        .class_named(path)
        .or_else(|| return find_class_relative(table, scope?, path));
}

/// A class named relative to `scope`: the first segment is looked up as a
/// visible simple name, the rest as nested classes.
pub fn find_class_relative<T: SymbolTable + ?Sized>(table: &T, scope: SymbolId, path: &str) -> Option<SymbolId> {
    let mut segments = path.split('.');
    let head = segments.next()?;
    let start = visible_class(table, scope, head)?;
    return segments.try_fold(start, |class, segment| return member_class(table, class, segment));
}

/// A simple class name visible from `scope`. Searched in order: enclosing
/// classes and their member classes, single-type imports, the same package,
/// on-demand imports, then the implicit packages.
fn visible_class<T: SymbolTable + ?Sized>(table: &T, scope: SymbolId, name: &str) -> Option<SymbolId> {
    let mut current = table.class_of(scope);
    while let Some(class) = current {
        let symbol = table.symbol(class)?;
        if symbol.name == name {
            return Some(class);
        }
        if let Some(member) = member_class(table, class, name) {
            return Some(member);
        }
        current = symbol.enclosing.and_then(|e| return table.class_of(e));
    }

    let imports: &[String] = match table.top_level_class_of(scope).and_then(|top| return table.symbol(top)) {
        Some(top) => &top.imports,
        None => &[],
    };
    let single = imports
        .iter()
        .filter(|i| return !i.ends_with(".*"))
        .find(|i| return i.rsplit('.').next() == Some(name))
        .and_then(|i| return table.class_named(i));
    if single.is_some() {
        return single;
    }

    let package = table.package_of(scope).and_then(|p| return table.symbol(p));
    if let Some(found) = package.and_then(|p| return table.class_named(&format!("{}.{name}", p.name))) {
        return Some(found);
    }

    let on_demand = imports
        .iter()
        .filter_map(|i| return i.strip_suffix(".*"))
        .find_map(|prefix| return table.class_named(&format!("{prefix}.{name}")));
    if on_demand.is_some() {
        return on_demand;
    }

    return table
        .implicit_packages()
        .iter()
        .find_map(|p| return table.class_named(&format!("{p}.{name}")));
}

/// A member class of `class` (or of its supertypes) named `name`.
fn member_class<T: SymbolTable + ?Sized>(table: &T, class: SymbolId, name: &str) -> Option<SymbolId> {
    return breadth_first_supertypes(table, class).into_iter().find_map(|level| {
        return table.symbol(level)?.members.iter().copied().find(|&m| {
            return table.symbol(m).is_some_and(|s| return s.kind.is_type() && s.name == name);
        });
    });
}

/// `class` followed by all its supertypes, breadth first, each once.
fn breadth_first_supertypes<T: SymbolTable + ?Sized>(table: &T, class: SymbolId) -> Vec<SymbolId> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([class]);
    while let Some(next) = queue.pop_front() {
        if seen.insert(next) {
            order.push(next);
            queue.extend(table.supertypes(next));
        }
    }
    return order;
}
