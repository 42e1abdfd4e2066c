// src/manifest.rs

//! Record of baked packages kept in the install root
//!
//! The manifest is a sorted JSON array of package names. It only affects a
//! run when `--skip-built` asks for previously baked packages to be skipped.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE: &str = "mkvfx-manifest.json";

/// Names of packages baked into an install root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    path: PathBuf,
    packages: BTreeSet<String>,
}

impl Manifest {
    /// Manifest location for `install_root`
    pub fn path_in(install_root: &Path) -> PathBuf {
        install_root.join(MANIFEST_FILE)
    }

    /// Load the manifest of `install_root`, empty if none was written yet
    pub fn load(install_root: &Path) -> Result<Self> {
        let path = Self::path_in(install_root);
        if !path.exists() {
            debug!("No manifest at {}", path.display());
            return Ok(Self {
                path,
                packages: BTreeSet::new(),
            });
        }

        let content = fs::read_to_string(&path)?;
        let packages: BTreeSet<String> = serde_json::from_str(&content).map_err(|e| {
            Error::ParseError(format!("Invalid manifest {}: {}", path.display(), e))
        })?;

        debug!("Loaded {} package(s) from {}", packages.len(), path.display());
        Ok(Self { path, packages })
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn record<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages.extend(names.into_iter().map(Into::into));
    }

    /// Write the manifest back as a sorted JSON array
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.packages)?;
        fs::write(&self.path, content + "\n")?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_manifest_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = Manifest::load(temp.path()).unwrap();
        assert_eq!(manifest.packages().count(), 0);
    }

    #[test]
    fn test_record_and_reload_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::load(temp.path()).unwrap();
        manifest.record(["zlib", "openexr", "ilmbase"]);
        manifest.save().unwrap();

        let content = fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap();
        let names: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(names, ["ilmbase", "openexr", "zlib"]);

        let mut reloaded = Manifest::load(temp.path()).unwrap();
        assert!(reloaded.contains("openexr"));

        reloaded.record(["boost", "zlib"]);
        reloaded.save().unwrap();
        assert_eq!(Manifest::load(temp.path()).unwrap().packages().count(), 4);
    }

    #[test]
    fn test_corrupt_manifest_is_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(MANIFEST_FILE), "{not json").unwrap();
        assert!(matches!(
            Manifest::load(temp.path()),
            Err(Error::ParseError(_))
        ));
    }
}
