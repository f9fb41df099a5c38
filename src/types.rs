/// Core domain types: symbols, types, and resolved references.
use std::fmt;

use url::Url;

use crate::doctext::DocComment;

/// Index of a symbol in its table. Only meaningful for the table that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(
    /// Position in the table's symbol list.
    pub u32,
);

/// Index of a declared type variable in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(
    /// Position in the table's type-variable list.
    pub u32,
);

/// What a symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    /// An annotation type.
    Annotation,
    /// A class.
    Class,
    /// A constructor.
    Constructor,
    /// An enumeration type.
    Enum,
    /// A constant of an enumeration type.
    EnumConstant,
    /// A field.
    Field,
    /// An interface.
    Interface,
    /// A method.
    Method,
    /// A module.
    Module,
    /// A package.
    Package,
}

impl SymbolKind {
    /// Class, interface, enum or annotation type.
    pub const fn is_type(self) -> bool {
        return matches!(self, Self::Annotation | Self::Class | Self::Enum | Self::Interface);
    }

    /// Constructor or method.
    pub const fn is_executable(self) -> bool {
        return matches!(self, Self::Constructor | Self::Method);
    }

    /// Field or enum constant.
    pub const fn is_variable(self) -> bool {
        return matches!(self, Self::EnumConstant | Self::Field);
    }

    /// Lowercase name used in style classes and CLI output.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Annotation => "annotation",
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::EnumConstant => "enum-constant",
            Self::Field => "field",
            Self::Interface => "interface",
            Self::Method => "method",
            Self::Module => "module",
            Self::Package => "package",
        };
    }
}

impl fmt::Display for SymbolKind {
    /// Same text as [`SymbolKind::as_str`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// A type as it appears in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// One array dimension around a component type.
    Array(Box<TypeRef>),
    /// A class known to the symbol table, with its type arguments.
    Declared {
        /// Type arguments in declaration order; empty for raw or non-generic use.
        args: Vec<TypeRef>,
        /// The class.
        symbol: SymbolId,
    },
    /// A primitive such as `int` or `void`.
    Primitive(String),
    /// A type name that the table could not place; kept as written.
    Unresolved(String),
    /// A use of a declared type variable.
    Variable(TypeVarId),
    /// `?`, `? extends U` or `? super L`.
    Wildcard {
        /// The `super` bound, if any.
        lower: Option<Box<TypeRef>>,
        /// The `extends` bound, if any.
        upper: Option<Box<TypeRef>>,
    },
}

/// Primitive type names recognised in signatures and type expressions.
pub const PRIMITIVES: [&str; 9] =
    ["boolean", "byte", "char", "double", "float", "int", "long", "short", "void"];

/// Whether `name` is one of [`PRIMITIVES`].
pub fn is_primitive(name: &str) -> bool {
    return PRIMITIVES.contains(&name);
}

/// A type after erasure: a base name and a dimension count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErasedType {
    /// Array dimensions, counting a varargs marker as one.
    pub dimensions: u32,
    /// Whether the base name was found in the symbol table (or is primitive).
    pub known: bool,
    /// Qualified class name or primitive name.
    pub name: String,
}

impl ErasedType {
    /// Compare two erasures. Names of types outside the table match by
    /// dotted suffix, so `String` meets `java.lang.String`.
    pub fn matches(&self, other: &Self) -> bool {
        if self.dimensions != other.dimensions {
            return false;
        }
        if self.name == other.name {
            return true;
        }
        if self.known && other.known {
            return false;
        }
        return is_dotted_suffix(&self.name, &other.name) || is_dotted_suffix(&other.name, &self.name);
    }
}

/// Whether `short` names the trailing segments of `long`.
fn is_dotted_suffix(long: &str, short: &str) -> bool {
    return long
        .strip_suffix(short)
        .is_some_and(|head| return head.ends_with('.'));
}

impl fmt::Display for ErasedType {
    /// Base name followed by one `[]` per dimension.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for _ in 0..self.dimensions {
            f.write_str("[]")?;
        }
        return Ok(());
    }
}

/// A formal parameter of an executable.
#[derive(Debug, Clone)]
pub struct Param {
    /// Declared name, used to pair `@param` tags with positions.
    pub name: String,
    /// Declared type. A varargs parameter is stored as its array type.
    pub ty: TypeRef,
}

/// A declared type variable and its bounds.
#[derive(Debug, Clone)]
pub struct TypeVariable {
    /// Upper bounds; empty means the root type.
    pub bounds: Vec<TypeRef>,
    /// Simple name, e.g. `T`.
    pub name: String,
    /// The class or executable declaring it.
    pub owner: SymbolId,
}

/// One node of the symbol graph.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Parsed documentation comment, if the symbol has one.
    pub doc: Option<DocComment>,
    /// Containing symbol: module of a package, package of a top-level class,
    /// class of a member or nested class.
    pub enclosing: Option<SymbolId>,
    /// For packages: whether the owning module exports it.
    pub exported: bool,
    /// For modules: the exported package names.
    pub exports: Vec<String>,
    /// Declared outside the documented universe; only its location is known.
    pub external: bool,
    /// This symbol's own id.
    pub id: SymbolId,
    /// Imports of a top-level class, fully qualified; on-demand imports
    /// end in `.*`.
    pub imports: Vec<String>,
    /// Implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<TypeRef>,
    /// Static member or static nested class.
    pub is_static: bool,
    /// What the symbol declares.
    pub kind: SymbolKind,
    /// Enclosed symbols in declaration order.
    pub members: Vec<SymbolId>,
    /// Simple name. Packages and modules use their full dotted name.
    pub name: String,
    /// Formal parameters of an executable.
    pub parameters: Vec<Param>,
    /// Unique name: `pkg.Outer.Inner` for classes, `pkg.C#m(int)` for members.
    pub qualified_name: String,
    /// Return type of a method.
    pub returns: Option<TypeRef>,
    /// Superclass of a class.
    pub superclass: Option<TypeRef>,
    /// Declared type parameters.
    pub type_parameters: Vec<TypeVarId>,
    /// Type of a field or enum constant.
    pub value_type: Option<TypeRef>,
    /// Whether the last parameter is varargs.
    pub varargs: bool,
}

/// Output of successful resolution. Populates only the narrowest applicable
/// combination: a field carries its class and package but no executable, a
/// package carries no class, and an imported symbol carries only a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedReference {
    /// The referenced class, or the class containing the referenced member.
    pub class: Option<SymbolId>,
    /// The referenced constructor or method.
    pub executable: Option<SymbolId>,
    /// The referenced field or enum constant.
    pub field: Option<SymbolId>,
    /// Absolute location of the page (and fragment) documenting the target.
    pub location: Option<Url>,
    /// The referenced module, for module-only signatures.
    pub module: Option<SymbolId>,
    /// The referenced package, or the package of the referenced class.
    pub package: Option<SymbolId>,
}

impl ResolvedReference {
    /// The narrowest symbol the reference points at, if any.
    pub fn target(&self) -> Option<SymbolId> {
        return self
            .field
            .or(self.executable)
            .or(self.class)
            .or(self.package)
            .or(self.module);
    }

    /// Whether the target was declared outside the documented universe.
    pub fn is_imported(&self) -> bool {
        return self.target().is_none();
    }
}
