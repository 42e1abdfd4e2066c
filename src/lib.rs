// src/lib.rs

//! mkvfx: recipe-driven builder for native VFX dependencies
//!
//! Given a JSON catalog of package recipes, mkvfx fetches, builds and
//! installs a requested package together with everything it depends on,
//! using the host's own toolchain (git, cmake, make, the shell).
//!
//! # Architecture
//!
//! - Catalog-first: all build knowledge lives in the recipe JSON
//! - Sequential: one package, one command at a time
//! - Explicit paths: commands run in a given directory, the process never
//!   changes its own working directory
//! - Three roots: install (`local/`), sources and build scratch

mod error;
pub mod manifest;
pub mod recipe;
pub mod toolchain;

pub use error::{Error, Result};
pub use manifest::{Manifest, MANIFEST_FILE};
pub use recipe::{
    BakeDriver, BakeOptions, BuildContext, Catalog, Executor, FailurePolicy, PackageRecipe,
    Platform, ShellExecutor,
};
pub use toolchain::Toolchain;
