// src/recipe/bake.rs

//! Dependency-aware bake driver
//!
//! Baking a package runs, in this fixed order:
//! 1. bake every dependency (recursively, in declared order)
//! 2. fetch the source
//! 3. run the build commands
//! 4. run the install commands
//!
//! Each step can be switched off through [`BakeOptions`]. Packages that
//! finished are remembered for the rest of the run, so shared dependencies
//! are baked once. A package that is reached again while it is still being
//! baked is a dependency cycle and fails the run.

use super::catalog::{Catalog, PackageRecipe, Phase};
use super::context::BuildContext;
use super::exec::Executor;
use super::fetch::{Downloader, Fetcher};
use super::runner::RecipeRunner;
use super::substitute::expand;
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info};

/// Which steps of a bake run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeOptions {
    pub fetch: bool,
    pub build: bool,
    pub install: bool,
    pub dependencies: bool,
    /// Print commands instead of running them
    pub dry_run: bool,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            fetch: true,
            build: true,
            install: true,
            dependencies: true,
            dry_run: false,
        }
    }
}

impl BakeOptions {
    /// Install previously built packages without fetching, building or
    /// touching dependencies
    pub fn install_only() -> Self {
        Self {
            fetch: false,
            build: false,
            install: true,
            dependencies: false,
            dry_run: false,
        }
    }
}

/// Bakes packages from a catalog, tracking what is done
pub struct BakeDriver<'a> {
    catalog: &'a Catalog,
    ctx: &'a BuildContext,
    options: BakeOptions,
    executor: &'a dyn Executor,
    downloader: &'a dyn Downloader,
    /// Packages finished in this run (or seeded from a manifest)
    built: HashSet<String>,
    /// Packages baked by this driver, in completion order
    completed: Vec<String>,
    /// Packages on the current dependency path
    in_progress: Vec<String>,
}

impl<'a> BakeDriver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        ctx: &'a BuildContext,
        options: BakeOptions,
        executor: &'a dyn Executor,
        downloader: &'a dyn Downloader,
    ) -> Self {
        Self {
            catalog,
            ctx,
            options,
            executor,
            downloader,
            built: HashSet::new(),
            completed: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    /// Treat `names` as already built
    pub fn mark_built<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.built.extend(names.into_iter().map(Into::into));
    }

    pub fn is_built(&self, name: &str) -> bool {
        self.built.contains(name)
    }

    /// Packages baked by this driver, in the order they finished
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Bake several packages in order
    pub fn bake_all<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            self.bake(name.as_ref())?;
        }
        Ok(())
    }

    /// Bake `name` and, first, everything it depends on
    pub fn bake(&mut self, name: &str) -> Result<()> {
        println!("Baking {}", name);

        if self.built.contains(name) {
            debug!("{} already built", name);
            return Ok(());
        }

        if let Some(pos) = self.in_progress.iter().position(|p| p == name) {
            let mut chain = self.in_progress[pos..].to_vec();
            chain.push(name.to_string());
            return Err(Error::DependencyCycle { chain });
        }

        let catalog = self.catalog;
        let recipe = catalog
            .get(name)
            .ok_or_else(|| Error::RecipeNotFound(name.to_string()))?;

        self.in_progress.push(name.to_string());
        let result = self.bake_recipe(recipe);
        self.in_progress.pop();
        result?;

        self.built.insert(name.to_string());
        self.completed.push(name.to_string());
        info!("Baked {}", name);
        Ok(())
    }

    fn bake_recipe(&mut self, recipe: &PackageRecipe) -> Result<()> {
        let platform = self.ctx.platform;
        let name = recipe.name.as_str();

        if self.options.dependencies {
            let dependencies = recipe.dependencies_for(platform);
            if !dependencies.is_empty() {
                for dep in dependencies {
                    self.bake(dep)?;
                }
                println!("Dependencies of {} baked, moving on to the entree", name);
            }
        }

        let dir_name = recipe
            .dir_for(platform)
            .map(|dir| expand(dir, self.ctx))
            .ok_or_else(|| Error::MissingField {
                package: name.to_string(),
                field: "dir",
            })?;

        match &recipe.repository {
            Some(repo) if self.options.fetch => {
                Fetcher::new(self.ctx, self.executor, self.downloader, self.options.dry_run)
                    .fetch(name, repo, &dir_name)?;
            }
            Some(_) => debug!("Fetching disabled, skipping {}", name),
            None => println!("Repository not specified, not fetching {}", name),
        }

        let runner = RecipeRunner::new(self.ctx, self.executor, self.options.dry_run);

        if self.options.build {
            println!("Building recipe: {}", name);
            let commands = self.commands(recipe, Phase::Build)?;
            runner.run_phase(Phase::Build, commands, recipe, &dir_name)?;
        }

        if self.options.install {
            println!("Installing {}", name);
            let commands = self.commands(recipe, Phase::Install)?;
            runner.run_phase(Phase::Install, commands, recipe, &dir_name)?;
        }

        Ok(())
    }

    fn commands<'r>(&self, recipe: &'r PackageRecipe, phase: Phase) -> Result<&'r [String]> {
        recipe
            .commands_for(phase, self.ctx.platform)
            .ok_or_else(|| Error::NoCommands {
                package: recipe.name.clone(),
                phase: phase.as_str(),
                platform: self.ctx.platform.to_string(),
            })
    }
}
