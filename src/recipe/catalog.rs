// src/recipe/catalog.rs

//! Recipe catalog format definitions
//!
//! The catalog is a JSON document with a `packages` array. Fields that can
//! vary by platform are written as the field name suffixed with the platform
//! identifier:
//!
//! ```json
//! {
//!   "packages": [
//!     {
//!       "name": "zlib",
//!       "dir": "zlib",
//!       "repository": { "type": "git", "url": "https://github.com/madler/zlib.git" },
//!       "recipe": ["cmake -DCMAKE_INSTALL_PREFIX=$(MKVFX_ROOT) .+", "&& make"],
//!       "recipe_windows": ["cmake -G \"Visual Studio 14 2015 Win64\" ."],
//!       "install": ["make install"]
//!     }
//!   ]
//! }
//! ```
//!
//! Suffixed keys are folded into a [`PlatformValue`] while loading, so the
//! rest of the crate never looks at raw keys.

use super::context::Platform;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A value with an optional generic form and per-platform overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformValue<T> {
    generic: Option<T>,
    overrides: BTreeMap<String, T>,
}

impl<T> Default for PlatformValue<T> {
    fn default() -> Self {
        Self {
            generic: None,
            overrides: BTreeMap::new(),
        }
    }
}

impl<T> PlatformValue<T> {
    /// Value that applies on every platform
    pub fn generic(value: T) -> Self {
        Self {
            generic: Some(value),
            overrides: BTreeMap::new(),
        }
    }

    /// Add an override for one platform
    pub fn with_override(mut self, platform: &str, value: T) -> Self {
        self.overrides.insert(platform.to_string(), value);
        self
    }

    /// The platform override if present, else the generic value
    pub fn resolve(&self, platform: Platform) -> Option<&T> {
        self.overrides
            .get(platform.as_str())
            .or(self.generic.as_ref())
    }

    /// True when neither a generic value nor any override is set
    pub fn is_unset(&self) -> bool {
        self.generic.is_none() && self.overrides.is_empty()
    }
}

/// How a package's source is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryKind {
    /// Shallow git clone, `git pull` on later fetches
    Git,
    /// Download a gzipped tarball and extract it in place
    CurlTgz,
    /// Download a zip or tar archive into the source root and unpack it there
    Zip,
    /// A type this version cannot fetch; skipped with a warning
    Unknown(String),
}

impl RepositoryKind {
    fn parse(kind: &str) -> Self {
        match kind {
            "git" => RepositoryKind::Git,
            "curl-tgz" | "archive-fetch" => RepositoryKind::CurlTgz,
            "zip" => RepositoryKind::Zip,
            other => RepositoryKind::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryKind::Git => f.write_str("git"),
            RepositoryKind::CurlTgz => f.write_str("curl-tgz"),
            RepositoryKind::Zip => f.write_str("zip"),
            RepositoryKind::Unknown(kind) => f.write_str(kind),
        }
    }
}

/// Source repository of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub kind: RepositoryKind,
    pub url: PlatformValue<String>,
    pub branch: Option<String>,
    /// Subdirectory of the checkout that holds the buildable tree
    pub repo_dir: Option<String>,
}

impl Repository {
    /// A git repository with only a generic URL
    pub fn git(url: &str) -> Self {
        Self {
            kind: RepositoryKind::Git,
            url: PlatformValue::generic(url.to_string()),
            branch: None,
            repo_dir: None,
        }
    }

    /// URL to fetch from on `platform`; empty URLs count as absent
    pub fn url_for(&self, platform: Platform) -> Option<&str> {
        self.url
            .resolve(platform)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

impl TryFrom<Map<String, Value>> for Repository {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> std::result::Result<Self, String> {
        let kind = take_plain::<String>(&mut map, "type")?.unwrap_or_default();
        let url = take_platform_value(&mut map, "url")?;
        let branch = take_plain::<String>(&mut map, "branch")?.filter(|b| !b.is_empty());
        let repo_dir = take_plain::<String>(&mut map, "repo_dir")?.filter(|d| !d.is_empty());

        Ok(Self {
            kind: RepositoryKind::parse(&kind),
            url,
            branch,
            repo_dir,
        })
    }
}

/// The two command phases a recipe declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    Install,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Build => "build",
            Phase::Install => "install",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct PackageRecipe {
    pub name: String,
    /// Source checkout directory template
    pub dir: PlatformValue<String>,
    pub repository: Option<Repository>,
    pub dependencies: PlatformValue<Vec<String>>,
    /// Build phase command templates (`recipe` in the catalog)
    pub build: PlatformValue<Vec<String>>,
    pub install: PlatformValue<Vec<String>>,
    /// Explicit working directory template
    pub build_in: PlatformValue<String>,
    /// Platforms listed in help output; `None` means all
    pub platforms: Option<Vec<String>>,
}

impl PackageRecipe {
    /// Create an empty recipe, mostly useful in tests
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: PlatformValue::default(),
            repository: None,
            dependencies: PlatformValue::default(),
            build: PlatformValue::default(),
            install: PlatformValue::default(),
            build_in: PlatformValue::default(),
            platforms: None,
        }
    }

    /// Source directory template for `platform`
    pub fn dir_for(&self, platform: Platform) -> Option<&str> {
        self.dir
            .resolve(platform)
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }

    /// Dependencies for `platform`, in declared order
    pub fn dependencies_for(&self, platform: Platform) -> &[String] {
        self.dependencies
            .resolve(platform)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Command list of a phase for `platform`
    pub fn commands_for(&self, phase: Phase, platform: Platform) -> Option<&[String]> {
        let commands = match phase {
            Phase::Build => &self.build,
            Phase::Install => &self.install,
        };
        commands.resolve(platform).map(Vec::as_slice)
    }

    /// Working directory override for `platform`
    pub fn build_in_for(&self, platform: Platform) -> Option<&str> {
        self.build_in
            .resolve(platform)
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }

    /// Whether this recipe is listed for `platform`
    pub fn supports(&self, platform: Platform) -> bool {
        match &self.platforms {
            Some(platforms) => platforms.iter().any(|p| p == platform.as_str()),
            None => true,
        }
    }
}

impl TryFrom<Map<String, Value>> for PackageRecipe {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> std::result::Result<Self, String> {
        let name = take_plain::<String>(&mut map, "name")?
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "package entry without a name".to_string())?;

        let repository = match take_plain::<Map<String, Value>>(&mut map, "repository")? {
            Some(repo) => Some(
                Repository::try_from(repo)
                    .map_err(|e| format!("repository of {}: {}", name, e))?,
            ),
            None => None,
        };

        let recipe = Self {
            dir: take_platform_value(&mut map, "dir")?,
            repository,
            dependencies: take_platform_value(&mut map, "dependencies")?,
            build: take_platform_value(&mut map, "recipe")?,
            install: take_platform_value(&mut map, "install")?,
            build_in: take_platform_value(&mut map, "build_in")?,
            platforms: take_plain(&mut map, "platforms")?,
            name,
        };

        if !map.is_empty() {
            let ignored: Vec<&str> = map.keys().map(String::as_str).collect();
            debug!("Ignoring unknown keys in {}: {}", recipe.name, ignored.join(", "));
        }

        Ok(recipe)
    }
}

/// Remove `field` from the map and deserialize it
fn take_plain<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    field: &str,
) -> std::result::Result<Option<T>, String> {
    match map.remove(field) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| format!("invalid `{}`: {}", field, e)),
    }
}

/// Remove `field` and every `field_<platform>` key from the map
fn take_platform_value<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    field: &str,
) -> std::result::Result<PlatformValue<T>, String> {
    let prefix = format!("{}_", field);
    let mut value = PlatformValue {
        generic: take_plain(map, field)?,
        overrides: BTreeMap::new(),
    };

    let suffixed: Vec<String> = map
        .keys()
        .filter(|k| k.len() > prefix.len() && k.starts_with(&prefix))
        .cloned()
        .collect();

    for key in suffixed {
        if let Some(v) = take_plain(map, &key)? {
            value.overrides.insert(key[prefix.len()..].to_string(), v);
        }
    }

    Ok(value)
}

/// Ordered, read-only collection of package recipes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    packages: Vec<PackageRecipe>,
}

impl Catalog {
    /// Build a catalog from recipes, keeping their order
    pub fn new(packages: Vec<PackageRecipe>) -> Self {
        Self { packages }
    }

    /// Parse a catalog from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid recipe catalog: {}", e)))
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ParseError(format!("Could not open {}: {}", path.display(), e))
        })?;

        let catalog = Self::from_json(&content)?;
        debug!(
            "Loaded {} recipes from {}",
            catalog.packages.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Look up a recipe by exact name; the first entry wins on duplicates
    pub fn get(&self, name: &str) -> Option<&PackageRecipe> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Map a user-supplied name to the catalog's spelling, ignoring case
    pub fn resolve_name(&self, name: &str) -> Option<&str> {
        self.packages
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.name.as_str())
    }

    /// All recipes in catalog order
    pub fn packages(&self) -> &[PackageRecipe] {
        &self.packages
    }

    /// Names of the recipes listed for `platform`
    pub fn names_for(&self, platform: Platform) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|p| p.supports(platform))
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
