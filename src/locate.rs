//! Where each symbol's documentation lives.

use url::Url;

use crate::symbols::SymbolTable;
use crate::types::{Symbol, SymbolId, SymbolKind};

/// Absolute destination of a symbol's generated page (and fragment).
pub trait Locator: Send + Sync {
    /// `None` when the symbol has no page anywhere we know of.
    fn locate(&self, symbol: SymbolId) -> Option<Url>;
}

/// An external documentation set, configured under `[[imports]]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ExternalDocs {
    /// URI template with `{package}`, `{path}`, `{class}` and `{member}` macros.
    pub location: String,
    /// Package prefix this set documents, e.g. `java`.
    pub prefix: String,
}

impl ExternalDocs {
    /// Whether this set documents `package`.
    fn covers(&self, package: &str) -> bool {
        return package == self.prefix
            || package.strip_prefix(self.prefix.as_str()).is_some_and(|rest| return rest.starts_with('.'));
    }
}

/// The file layout of one generated slice.
pub struct PageLayout<'g> {
    /// Output root, as a directory URL.
    base: Url,
    /// Symbol universe being laid out.
    graph: &'g dyn SymbolTable,
    /// External sets for symbols declared outside the universe.
    imports: &'g [ExternalDocs],
    /// Appended to every file name, e.g. `.en` for a negotiated variant.
    suffix: String,
}

impl std::fmt::Debug for PageLayout<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("PageLayout")
            .field("base", &self.base.as_str())
            .field("imports", &self.imports)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive();
    }
}

impl<'g> PageLayout<'g> {
    /// Lay out `graph` under `base`.
    pub fn new(graph: &'g dyn SymbolTable, base: Url, imports: &'g [ExternalDocs], suffix: &str) -> Self {
        return Self {
            base: crate::uri::assume_directory(base),
            graph,
            imports,
            suffix: suffix.to_string(),
        };
    }

    /// Output root.
    pub const fn base(&self) -> &Url {
        return &self.base;
    }

    /// Path of the page documenting `id`, relative to the output root.
    /// Members live on their class's page and have no path of their own.
    pub fn page_path(&self, id: SymbolId) -> Option<String> {
        let symbol = self.graph.symbol(id)?;
        if symbol.external {
            return None;
        }
        let suffix = &self.suffix;
        return match symbol.kind {
            SymbolKind::Module => Some(format!("{}-module.html{suffix}", symbol.name)),
            SymbolKind::Package => Some(in_package(&symbol.name, &format!("package-summary.html{suffix}"))),
            kind if kind.is_type() => {
                let (package, class) = self.split_class_name(id, symbol)?;
                Some(in_package(&package, &format!("{class}.html{suffix}")))
            },
            _ => None,
        };
    }

    /// The package name and the dotted nested class name of a class.
    fn split_class_name(&self, id: SymbolId, symbol: &Symbol) -> Option<(String, String)> {
        let package = self.graph.symbol(self.graph.package_of(id)?)?.name.clone();
        let class = symbol
            .qualified_name
            .strip_prefix(package.as_str())
            .and_then(|rest| return rest.strip_prefix('.'))
            .unwrap_or(&symbol.qualified_name)
            .to_string();
        return Some((package, class));
    }

    /// Location through a configured import; the longest matching prefix wins.
    fn locate_external(&self, id: SymbolId, symbol: &Symbol) -> Option<Url> {
        let class_id = self.graph.class_of(id);
        let package_id = self.graph.package_of(id)?;
        let package = self.graph.symbol(package_id)?.name.clone();
        let docs = self
            .imports
            .iter()
            .filter(|d| return d.covers(&package))
            .max_by_key(|d| return d.prefix.len())?;

        let class = match class_id.and_then(|c| return Some((c, self.graph.symbol(c)?))) {
            Some((c, class_symbol)) => self.split_class_name(c, class_symbol)?.1,
            None => "package-summary".to_string(),
        };
        let member = member_fragment(self.graph, id, symbol).unwrap_or_default();
        let mut text = docs
            .location
            .replace("{package}", &package)
            .replace("{path}", &package_path(&package))
            .replace("{class}", &class);
        if docs.location.contains("{member}") {
            text = text.replace("{member}", &member);
        } else if !member.is_empty() {
            text.push('#');
            text.push_str(&member);
        }
        return Url::parse(&text).or_else(|_| return self.base.join(&text)).ok();
    }
}

impl Locator for PageLayout<'_> {
    fn locate(&self, id: SymbolId) -> Option<Url> {
        let symbol = self.graph.symbol(id)?;
        if symbol.external {
            return self.locate_external(id, symbol);
        }
        if let Some(fragment) = member_fragment(self.graph, id, symbol) {
            let mut url = self.locate(symbol.enclosing?)?;
            url.set_fragment(Some(&fragment));
            return Some(url);
        }
        return self.base.join(&self.page_path(id)?).ok();
    }
}

/// `pkg.sub` as `pkg/sub`.
fn package_path(package: &str) -> String {
    return package.replace('.', "/");
}

/// `file` inside the directory of `package`; the unnamed package is the
/// output root itself.
fn in_package(package: &str, file: &str) -> String {
    if package.is_empty() {
        return file.to_string();
    }
    return format!("{}/{file}", package_path(package));
}

/// Fragment naming a member on its class page: `name` for fields and
/// constants, `name(erased,params)` for executables.
fn member_fragment(graph: &dyn SymbolTable, id: SymbolId, symbol: &Symbol) -> Option<String> {
    if symbol.kind.is_variable() {
        return Some(symbol.name.clone());
    }
    if symbol.kind.is_executable() {
        let params: Vec<String> = graph.erased_parameters(id).iter().map(|e| return e.to_string()).collect();
        return Some(format!("{}({})", symbol.name, params.join(",")));
    }
    return None;
}
