// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Boolean flag with a long name only
fn switch(name: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(long).action(ArgAction::SetTrue).help(help)
}

pub(crate) fn build_cli() -> Command {
    Command::new("mkvfx")
        .version(env!("CARGO_PKG_VERSION"))
        .author("mkvfx Contributors")
        .about("Fetch, build and install VFX libraries and their dependencies")
        .disable_help_flag(true)
        .arg(
            Arg::new("help")
                .short('h')
                .long("help")
                .action(ArgAction::SetTrue)
                .help("Print usage and the available packages"),
        )
        .arg(switch("install", "install", "Only run install commands (no fetch, build or dependencies)"))
        .arg(switch("no_fetch", "nofetch", "Don't fetch sources (-nf)"))
        .arg(switch("no_build", "nobuild", "Don't run build commands (-nb)"))
        .arg(switch("no_dependencies", "nodependencies", "Don't bake dependencies (-nd)"))
        .arg(switch("no_install", "noinstall", "Don't run install commands (-ni)"))
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Bake every package of the catalog"),
        )
        .arg(switch("dry_run", "dry-run", "Print commands instead of running them"))
        .arg(
            Arg::new("recipes")
                .long("recipes")
                .value_name("PATH")
                .help("Recipe catalog (default: <exe dir>/lib/recipes-<platform>64.json)"),
        )
        .arg(
            Arg::new("src")
                .long("src")
                .value_name("DIR")
                .help("Source root (default: ~/mkvfx-sources)"),
        )
        .arg(switch("skip_built", "skip-built", "Skip packages recorded in the install root's manifest"))
        .arg(
            Arg::new("retries")
                .long("retries")
                .value_name("N")
                .default_value("0")
                .help("Retry a failing command this many times"),
        )
        .arg(
            Arg::new("ignore_exit_codes")
                .long("ignore-exit-code")
                .value_name("CODE")
                .action(ArgAction::Append)
                .help("Treat this exit code as success (repeatable)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("packages")
                .value_name("PACKAGE")
                .num_args(0..)
                .help("Packages to bake"),
        )
}

/// Render `man/mkvfx.1` under the crate root
fn write_man_page() -> std::io::Result<PathBuf> {
    let manifest_dir = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| std::io::Error::other("CARGO_MANIFEST_DIR not set"))?;
    let man_dir = manifest_dir.join("man");
    fs::create_dir_all(&man_dir)?;

    let mut buffer = Vec::new();
    Man::new(build_cli()).render(&mut buffer)?;

    let man_path = man_dir.join("mkvfx.1");
    fs::write(&man_path, buffer)?;
    Ok(man_path)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/cli.rs");

    if let Err(e) = write_man_page() {
        println!("cargo:warning=Failed to generate man page: {}", e);
    }
}
