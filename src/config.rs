use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::locate::ExternalDocs;
use crate::resolver::{PathPrecedence, ResolveOptions};
use crate::signature::IdentifierPolicy;
use crate::slice::SliceSpecification;

/// Name of the configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = ".refweave.toml";

/// Project configuration loaded from `.refweave.toml`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Absolute base URI of the output root; derived from `output` if unset.
    pub base: Option<String>,
    /// Symbol graph JSON.
    pub graph: PathBuf,
    /// Identifier characters the signature parser accepts.
    pub identifiers: IdentifierPolicy,
    /// External documentation sets.
    pub imports: Vec<ExternalDocs>,
    /// Whether member lookup searches supertypes.
    pub inherited_members: bool,
    /// Output directory.
    pub output: PathBuf,
    /// Which reading wins when a dotted path names a package and a class.
    pub path_precedence: PathPrecedence,
    /// Output variants; never empty after loading.
    pub slices: Vec<SliceSpecification>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            base: None,
            graph: PathBuf::from("symbols.json"),
            identifiers: IdentifierPolicy::default(),
            imports: Vec::new(),
            inherited_members: true,
            output: PathBuf::from("docs"),
            path_precedence: PathPrecedence::default(),
            slices: vec![SliceSpecification::default()],
        };
    }
}

impl Config {
    /// Load config from `.refweave.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist. A file that exists
    /// but is malformed is an error, never a silent fallback.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut config: Self = toml::from_str(content)?;
        if config.slices.is_empty() {
            config.slices.push(SliceSpecification::default());
        }
        return Ok(config);
    }

    /// Resolution switches for the reference resolver.
    pub const fn resolve_options(&self) -> ResolveOptions {
        return ResolveOptions {
            inherited_members: self.inherited_members,
            path_precedence: self.path_precedence,
        };
    }

    /// Base URI of the output root: `base` if set, else `output` as a
    /// `file:` directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBase` if neither yields a usable URI.
    pub fn base_url(&self) -> Result<url::Url, Error> {
        let text = match &self.base {
            Some(base) => base.clone(),
            None if self.output.is_absolute() => self.output.display().to_string(),
            None => format!("./{}", self.output.display()),
        };
        return Ok(crate::uri::assume_directory(crate::uri::file_or_uri(&text)?));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::escape::Charset;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.slices.len(), 1);
        assert!(config.inherited_members);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "graph = [").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
        assert!(Config::parse("grpah = \"x.json\"").is_err());
    }

    #[test]
    fn every_key() {
        let config = Config::parse(
            r#"
base = "https://docs.example.org/api/"
graph = "build/graph.json"
identifiers = "ascii"
inherited_members = false
output = "site"
path_precedence = "class-first"

[[slices]]
locale = "en-US"
charset = "iso-8859-1"
suffix = ".en"

[[imports]]
prefix = "java"
location = "https://docs.oracle.com/api/{path}/{class}.html"
"#,
        )
        .unwrap();
        assert_eq!(config.graph, PathBuf::from("build/graph.json"));
        assert_eq!(config.identifiers, IdentifierPolicy::Ascii);
        assert_eq!(config.path_precedence, PathPrecedence::ClassFirst);
        assert!(!config.resolve_options().inherited_members);
        let slice = config.slices.first().unwrap();
        assert_eq!(slice.charset, Charset::Latin1);
        assert_eq!(slice.suffix, ".en");
        assert_eq!(config.imports.first().unwrap().prefix, "java");
        assert_eq!(config.base_url().unwrap().as_str(), "https://docs.example.org/api/");
    }

    #[test]
    fn base_defaults_to_output_directory() {
        let config = Config { output: PathBuf::from("/tmp/site"), ..Config::default() };
        assert_eq!(config.base_url().unwrap().as_str(), "file:///tmp/site/");
    }
}
