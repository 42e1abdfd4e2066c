// src/recipe/mod.rs

//! Recipe engine for baking native dependencies from source
//!
//! A recipe catalog describes, per package:
//! - Where the source lives (git repository or tarball URL)
//! - Which other packages must be baked first
//! - The build and install command lines
//! - Optionally, the directory those commands run in
//!
//! # Culinary Terminology
//!
//! - **Recipe**: One catalog entry
//! - **Bake**: Dependencies, then fetch, build and install a package
//! - **Phase**: The build or install half of a recipe
//!
//! # Example Recipe
//!
//! ```json
//! {
//!   "name": "ilmbase",
//!   "dir": "openexr",
//!   "repository": { "type": "git", "url": "https://github.com/openexr/openexr.git" },
//!   "dependencies": ["zlib"],
//!   "build_in": "$(MKVFX_SRC_ROOT)/openexr/IlmBase",
//!   "recipe": ["cmake -DCMAKE_INSTALL_PREFIX=$(MKVFX_ROOT) .", "make"],
//!   "install": ["make install"],
//!   "install_windows": ["cmake --build . --target install --config Release"]
//! }
//! ```
//!
//! Any field can carry a `_<platform>` suffixed variant (`osx`, `windows`,
//! `linux`) that wins over the plain field on that platform.

mod bake;
mod catalog;
mod context;
mod exec;
mod fetch;
mod runner;
mod substitute;

pub use bake::{BakeDriver, BakeOptions};
pub use catalog::{Catalog, PackageRecipe, Phase, PlatformValue, Repository, RepositoryKind};
pub use context::{
    BuildContext, Platform, BUILD_DIR_NAME, INSTALL_DIR_NAME, SOURCE_DIR_NAME,
};
pub use exec::{CommandOutput, Executor, FailurePolicy, ShellExecutor};
pub use fetch::{extract_archive, extract_tarball, git_command, Downloader, Fetcher, HttpDownloader};
pub use runner::{ensure_dir, merge_continuations, working_dir, RecipeRunner};
pub use substitute::{
    expand, has_placeholder, BUILD_ROOT_VAR, INSTALL_ROOT_VAR, SOURCE_ROOT_VAR,
};
