// src/recipe/context.rs

//! Build context: the root paths and platform every recipe is expanded against

use super::runner::ensure_dir;
use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the user's home where sources are checked out
pub const SOURCE_DIR_NAME: &str = "mkvfx-sources";

/// Directory under the user's home used as the build root
pub const BUILD_DIR_NAME: &str = "mkvfx-build";

/// Directory under the current directory that receives installed files
pub const INSTALL_DIR_NAME: &str = "local";

/// Layout created under the install root
const INSTALL_SUBDIRS: &[&str] = &["bin", "include", "lib", "man/man1"];

/// Platform a catalog is written for
///
/// The identifier doubles as the suffix of platform-specific recipe keys,
/// e.g. `recipe_osx` or `install_windows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Osx,
    Windows,
    Linux,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn detect() -> Result<Self> {
        match env::consts::OS {
            "macos" => Ok(Platform::Osx),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Identifier used as the recipe key suffix
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Osx => "osx",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }

    /// File name of the default recipe catalog for this platform
    pub fn recipes_file(&self) -> &'static str {
        match self {
            Platform::Osx => "recipes-osx64.json",
            Platform::Windows => "recipes-win64.json",
            Platform::Linux => "recipes-linux64.json",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root paths and platform shared read-only by every component
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Where packages install to (`$(MKVFX_ROOT)`)
    pub install_root: PathBuf,
    /// Where sources are fetched to (`$(MKVFX_SRC_ROOT)`)
    pub source_root: PathBuf,
    /// Scratch build root (`$(MKVFX_BUILD_ROOT)`)
    pub build_root: PathBuf,
    pub platform: Platform,
}

impl BuildContext {
    /// Create a context from explicit roots
    pub fn new(
        install_root: impl Into<PathBuf>,
        source_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
        platform: Platform,
    ) -> Self {
        Self {
            install_root: install_root.into(),
            source_root: source_root.into(),
            build_root: build_root.into(),
            platform,
        }
    }

    /// Compute the default context from the working directory and home
    ///
    /// `source_override` replaces the default `<home>/mkvfx-sources`.
    pub fn from_env(source_override: Option<&Path>) -> Result<Self> {
        let platform = Platform::detect()?;
        let cwd = env::current_dir()?;
        let home = dirs::home_dir().ok_or_else(|| {
            Error::EnvironmentError("Could not determine the user's home directory".to_string())
        })?;

        let source_root = match source_override {
            Some(src) if src.is_absolute() => src.to_path_buf(),
            Some(src) => cwd.join(src),
            None => home.join(SOURCE_DIR_NAME),
        };

        Ok(Self::new(
            cwd.join(INSTALL_DIR_NAME),
            source_root,
            home.join(BUILD_DIR_NAME),
            platform,
        ))
    }

    /// Checkout directory of a package: `<source-root>/<dir_name>`
    pub fn source_dir(&self, dir_name: &str) -> PathBuf {
        self.source_root.join(dir_name)
    }

    /// Create the install tree, the source root and the build root
    pub fn scaffold(&self) -> Result<()> {
        ensure_dir(&self.install_root)?;
        for sub in INSTALL_SUBDIRS {
            ensure_dir(&self.install_root.join(sub))?;
        }
        ensure_dir(&self.source_root)?;
        ensure_dir(&self.build_root)?;

        debug!("Scaffolded {}", self.install_root.display());
        Ok(())
    }
}
