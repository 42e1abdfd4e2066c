// src/recipe/runner.rs

//! Runs the build or install commands of one package
//!
//! A phase runs in a single working directory:
//! 1. the platform-specific `build_in` of the recipe, else
//! 2. the generic `build_in`, else
//! 3. `<source-root>/<dir>`
//!
//! Lines ending in `+` are joined with the following line before anything
//! is expanded, so long commands can be split across several JSON strings.

use super::catalog::{PackageRecipe, Phase};
use super::context::BuildContext;
use super::exec::Executor;
use super::substitute::expand;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Marker at the end of a line that continues on the next one
const CONTINUATION: char = '+';

/// Join every line ending in `+` with the line after it
///
/// `["a+", "b+", "c"]` becomes `["a b c"]`. A trailing `+` on the last line
/// has nothing to join and is left alone.
pub fn merge_continuations(commands: &[String]) -> Vec<String> {
    let mut merged = commands.to_vec();
    if merged.len() < 2 {
        return merged;
    }

    for r in (0..merged.len() - 1).rev() {
        if let Some(head) = merged[r].strip_suffix(CONTINUATION).map(str::to_string) {
            let next = merged.remove(r + 1);
            merged[r] = format!("{} {}", head, next);
        }
    }

    merged
}

/// Working directory of a package's phases
pub fn working_dir(recipe: &PackageRecipe, dir_name: &str, ctx: &BuildContext) -> PathBuf {
    match recipe.build_in_for(ctx.platform) {
        Some(build_in) => PathBuf::from(expand(build_in, ctx)),
        None => ctx.source_dir(dir_name),
    }
}

/// Create `dir` (and parents) unless it already is a directory
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(Error::DirectoryError {
            path: dir.to_path_buf(),
            reason: "path exists but is not a directory".to_string(),
        });
    }

    fs::create_dir_all(dir).map_err(|e| Error::DirectoryError {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Expands and executes recipe command lists
pub struct RecipeRunner<'a> {
    ctx: &'a BuildContext,
    executor: &'a dyn Executor,
    dry_run: bool,
}

impl<'a> RecipeRunner<'a> {
    pub fn new(ctx: &'a BuildContext, executor: &'a dyn Executor, dry_run: bool) -> Self {
        Self {
            ctx,
            executor,
            dry_run,
        }
    }

    /// Run one phase's commands for `package`
    pub fn run_phase(
        &self,
        phase: Phase,
        commands: &[String],
        recipe: &PackageRecipe,
        dir_name: &str,
    ) -> Result<()> {
        let package = &recipe.name;
        let workdir = working_dir(recipe, dir_name, self.ctx);

        info!("{} phase of {}", phase, package);
        println!("package: {} in directory: {}", package, workdir.display());

        if !self.dry_run {
            ensure_dir(&workdir)?;
        }

        let commands = merge_continuations(commands);
        debug!("{} {} command(s) after joining continuations", commands.len(), phase);

        for command in commands {
            let command = expand(&command, self.ctx);
            if self.dry_run {
                println!("Simulating: {}", command);
            } else {
                self.executor.run(&command, Some(&workdir))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::catalog::PlatformValue;
    use crate::recipe::context::Platform;
    use crate::recipe::exec::CommandOutput;
    use std::cell::RefCell;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<(String, Option<PathBuf>)>>,
    }

    impl Executor for RecordingExecutor {
        fn run(&self, command: &str, working_dir: Option<&Path>) -> Result<CommandOutput> {
            self.calls
                .borrow_mut()
                .push((command.to_string(), working_dir.map(Path::to_path_buf)));
            Ok(CommandOutput::default())
        }
    }

    fn context(root: &Path) -> BuildContext {
        BuildContext::new(
            root.join("local"),
            root.join("sources"),
            root.join("build"),
            Platform::Osx,
        )
    }

    #[test]
    fn test_merge_single_continuation() {
        let merged = merge_continuations(&strings(&["configure+", "--flag", "build"]));
        assert_eq!(merged, ["configure --flag", "build"]);
    }

    #[test]
    fn test_merge_chain_collapses() {
        let merged = merge_continuations(&strings(&["a+", "b+", "c"]));
        assert_eq!(merged, ["a b c"]);

        let merged = merge_continuations(&strings(&["configure+", "--flag+", "build"]));
        assert_eq!(merged, ["configure --flag build"]);
    }

    #[test]
    fn test_merge_leaves_plain_lines() {
        let merged = merge_continuations(&strings(&["x", "a+", "b", "y+"]));
        assert_eq!(merged, ["x", "a b", "y+"]);
        assert!(merge_continuations(&[]).is_empty());
        assert_eq!(merge_continuations(&strings(&["only+"])), ["only+"]);
    }

    #[test]
    fn test_working_dir_precedence() {
        let ctx = context(Path::new("/r"));
        let mut recipe = PackageRecipe::new("ilmbase");
        assert_eq!(working_dir(&recipe, "openexr", &ctx), PathBuf::from("/r/sources/openexr"));

        recipe.build_in = PlatformValue::generic("$(MKVFX_BUILD_ROOT)/generic".to_string());
        assert_eq!(working_dir(&recipe, "openexr", &ctx), PathBuf::from("/r/build/generic"));

        recipe.build_in = recipe
            .build_in
            .with_override("osx", "$(MKVFX_SRC_ROOT)/openexr/IlmBase".to_string());
        assert_eq!(
            working_dir(&recipe, "openexr", &ctx),
            PathBuf::from("/r/sources/openexr/IlmBase")
        );
    }

    #[test]
    fn test_run_phase_expands_and_executes_in_workdir() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let exec = RecordingExecutor::default();
        let runner = RecipeRunner::new(&ctx, &exec, false);

        let recipe = PackageRecipe::new("zlib");
        let commands = strings(&["cmake+", "-DCMAKE_INSTALL_PREFIX=$(MKVFX_ROOT) .", "make"]);
        runner.run_phase(Phase::Build, &commands, &recipe, "zlib").unwrap();

        let workdir = ctx.source_dir("zlib");
        assert!(workdir.is_dir());

        let calls = exec.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].0,
            format!("cmake -DCMAKE_INSTALL_PREFIX={} .", ctx.install_root.display())
        );
        assert_eq!(calls[0].1.as_deref(), Some(workdir.as_path()));
        assert_eq!(calls[1].0, "make");
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        let exec = RecordingExecutor::default();
        let runner = RecipeRunner::new(&ctx, &exec, true);

        runner
            .run_phase(Phase::Install, &strings(&["make install"]), &PackageRecipe::new("zlib"), "zlib")
            .unwrap();
        assert!(exec.calls.borrow().is_empty());
        // A later real fetch must still see a missing checkout and clone it
        assert!(!ctx.source_dir("zlib").exists());
    }

    #[test]
    fn test_workdir_that_is_a_file_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = context(temp.path());
        fs::create_dir_all(&ctx.source_root).unwrap();
        fs::write(ctx.source_dir("zlib"), "not a dir").unwrap();

        let exec = RecordingExecutor::default();
        let runner = RecipeRunner::new(&ctx, &exec, false);
        let err = runner
            .run_phase(Phase::Build, &strings(&["make"]), &PackageRecipe::new("zlib"), "zlib")
            .unwrap_err();
        assert!(matches!(err, Error::DirectoryError { .. }));
        assert!(exec.calls.borrow().is_empty());
    }
}
