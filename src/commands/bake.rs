// src/commands/bake.rs

//! Bake command - fetch, build and install packages from the recipe catalog

use crate::cli::Cli;
use anyhow::{Context, Result};
use clap::CommandFactory;
use mkvfx::recipe::HttpDownloader;
use mkvfx::{
    BakeDriver, BakeOptions, BuildContext, Catalog, Error, FailurePolicy, Manifest, Platform,
    ShellExecutor, Toolchain,
};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bake the packages named on the command line
pub fn cmd_bake(cli: &Cli) -> Result<()> {
    let ctx = BuildContext::from_env(cli.src.as_deref())?;
    info!(
        "platform: {}, install root: {}, source root: {}, build root: {}",
        ctx.platform,
        ctx.install_root.display(),
        ctx.source_root.display(),
        ctx.build_root.display()
    );

    let catalog_path = match &cli.recipes {
        Some(path) => path.clone(),
        None => default_catalog_path(ctx.platform)?,
    };
    let catalog = Catalog::load(&catalog_path)
        .with_context(|| format!("Failed to load recipes: {}", catalog_path.display()))?;

    if cli.help || (cli.packages.is_empty() && !cli.all) {
        print_usage(&catalog, ctx.platform);
        return Ok(());
    }

    let names = if cli.all {
        catalog
            .names_for(ctx.platform)
            .into_iter()
            .map(String::from)
            .collect()
    } else {
        resolve_names(&catalog, &cli.packages)?
    };

    let options = bake_options(cli);
    debug!("{:?}", options);

    ctx.scaffold().context("Failed to create the mkvfx directories")?;
    Toolchain::require(ctx.platform)?;

    let executor = ShellExecutor::new(FailurePolicy {
        ignored_exit_codes: cli.ignore_exit_codes.clone(),
        retries: cli.retries,
    });
    let downloader = HttpDownloader::new()?;

    let mut manifest = Manifest::load(&ctx.install_root)?;
    let mut driver = BakeDriver::new(&catalog, &ctx, options, &executor, &downloader);
    if cli.skip_built {
        driver.mark_built(manifest.packages().map(String::from));
    }

    if options.dry_run {
        println!("Dry run: commands are printed, not executed");
    }

    driver.bake_all(&names)?;

    let baked = driver.completed();
    if !options.dry_run && !baked.is_empty() {
        manifest.record(baked.iter().cloned());
        manifest
            .save()
            .with_context(|| format!("Failed to write {}", Manifest::path_in(&ctx.install_root).display()))?;
    }

    println!("\n[COMPLETE] Baked {} package(s)", baked.len());
    for name in baked {
        println!("  - {}", name);
    }

    Ok(())
}

/// `<executable dir>/lib/recipes-<platform>64.json`
fn default_catalog_path(platform: Platform) -> Result<PathBuf> {
    let exe = env::current_exe().context("Failed to locate the mkvfx executable")?;
    let dir = exe
        .parent()
        .context("The mkvfx executable has no parent directory")?;
    Ok(dir.join("lib").join(platform.recipes_file()))
}

/// Map command-line names to catalog names, ignoring case
fn resolve_names(catalog: &Catalog, requested: &[String]) -> mkvfx::Result<Vec<String>> {
    requested
        .iter()
        .map(|name| {
            catalog
                .resolve_name(name)
                .map(String::from)
                .ok_or_else(|| Error::UnknownOption(name.clone()))
        })
        .collect()
}

fn bake_options(cli: &Cli) -> BakeOptions {
    let mut options = if cli.install {
        BakeOptions::install_only()
    } else {
        BakeOptions {
            fetch: !cli.no_fetch,
            build: !cli.no_build,
            install: !cli.no_install,
            dependencies: !cli.no_dependencies,
            dry_run: false,
        }
    };
    options.dry_run = cli.dry_run;
    options
}

fn print_usage(catalog: &Catalog, platform: Platform) {
    let mut cmd = Cli::command();
    println!("{}", cmd.render_help());

    println!("Known packages on {}:", platform);
    for name in catalog.names_for(platform) {
        println!("  {}", name);
    }
}
