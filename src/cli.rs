// src/cli.rs
//! CLI definitions for mkvfx
//!
//! mkvfx takes a flat list of flags and package names, e.g.
//! `mkvfx -nf openexr oiio`. Flags are case-insensitive and accept the
//! historical short forms `-nf`, `-nb`, `-nd`, `-ni` and `-nfd`, which are
//! rewritten to their long names before clap sees them.

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::Parser;
use mkvfx::{Error, Result};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "mkvfx")]
#[command(author = "mkvfx Contributors")]
#[command(version)]
#[command(about = "Fetch, build and install VFX libraries and their dependencies", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Print usage and the available packages
    #[arg(short = 'h', long)]
    pub help: bool,

    /// Only run install commands (no fetch, build or dependencies)
    #[arg(long)]
    pub install: bool,

    /// Don't fetch sources (-nf)
    #[arg(long = "nofetch")]
    pub no_fetch: bool,

    /// Don't run build commands (-nb)
    #[arg(long = "nobuild")]
    pub no_build: bool,

    /// Don't bake dependencies (-nd)
    #[arg(long = "nodependencies")]
    pub no_dependencies: bool,

    /// Don't run install commands (-ni)
    #[arg(long = "noinstall")]
    pub no_install: bool,

    /// Bake every package of the catalog
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Print commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Recipe catalog (default: <exe dir>/lib/recipes-<platform>64.json)
    #[arg(long, value_name = "PATH")]
    pub recipes: Option<PathBuf>,

    /// Source root (default: ~/mkvfx-sources)
    #[arg(long, value_name = "DIR")]
    pub src: Option<PathBuf>,

    /// Skip packages recorded in the install root's manifest
    #[arg(long)]
    pub skip_built: bool,

    /// Retry a failing command this many times
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub retries: u32,

    /// Treat this exit code as success (repeatable)
    #[arg(long = "ignore-exit-code", value_name = "CODE", allow_negative_numbers = true)]
    pub ignore_exit_codes: Vec<i32>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Packages to bake
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,
}

/// Flags whose next argument is a value and keeps its case
const VALUE_FLAGS: &[&str] = &["--recipes", "--src"];

/// Rewrite raw arguments into the form clap parses
///
/// Everything except the program name and path values is lower-cased.
pub fn normalize_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<String> = args.next().into_iter().collect();
    let mut keep_case = false;

    for arg in args {
        if keep_case {
            keep_case = false;
            normalized.push(arg);
            continue;
        }

        let lower = arg.to_lowercase();
        match lower.as_str() {
            "-nf" => normalized.push("--nofetch".to_string()),
            "-nb" => normalized.push("--nobuild".to_string()),
            "-nd" => normalized.push("--nodependencies".to_string()),
            "-ni" => normalized.push("--noinstall".to_string()),
            "-nfd" => {
                normalized.push("--nofetch".to_string());
                normalized.push("--nodependencies".to_string());
            }
            flag if VALUE_FLAGS.contains(&flag) => {
                keep_case = true;
                normalized.push(lower);
            }
            _ if VALUE_FLAGS.iter().any(|f| lower.starts_with(&format!("{f}="))) => {
                // --src=<dir>: lower-case the flag only
                let (flag, value) = arg.split_at(arg.find('=').unwrap_or(arg.len()));
                normalized.push(format!("{}{}", flag.to_lowercase(), value));
            }
            _ => normalized.push(lower),
        }
    }

    normalized
}

impl Cli {
    /// Parse raw process arguments
    ///
    /// Unknown flags become [`Error::UnknownOption`]; `--version` and other
    /// clap-handled requests print and exit.
    pub fn parse_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match Self::try_parse_from(normalize_args(args)) {
            Ok(cli) => Ok(cli),
            Err(e) if e.kind() == ErrorKind::UnknownArgument => {
                let token = match e.get(ContextKind::InvalidArg) {
                    Some(ContextValue::String(s)) => s.clone(),
                    _ => e.to_string(),
                };
                Err(Error::UnknownOption(token))
            }
            Err(e) if e.use_stderr() => Err(Error::ParseError(e.to_string())),
            Err(e) => e.exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mkvfx"];
        argv.extend_from_slice(args);
        Cli::parse_args(argv).unwrap()
    }

    #[test]
    fn test_short_forms_and_case() {
        let cli = parse(&["-NF", "-nb", "OpenEXR"]);
        assert!(cli.no_fetch);
        assert!(cli.no_build);
        assert!(!cli.no_install);
        assert_eq!(cli.packages, ["openexr"]);

        let cli = parse(&["-nfd", "zlib"]);
        assert!(cli.no_fetch);
        assert!(cli.no_dependencies);
        assert!(!cli.no_build);
    }

    #[test]
    fn test_paths_keep_case() {
        let cli = parse(&["--Recipes", "/Data/Recipes.json", "--src=/Volumes/Src", "zlib"]);
        assert_eq!(cli.recipes, Some(PathBuf::from("/Data/Recipes.json")));
        assert_eq!(cli.src, Some(PathBuf::from("/Volumes/Src")));
    }

    #[test]
    fn test_failure_policy_flags() {
        let cli = parse(&["--retries", "2", "--ignore-exit-code", "57", "--ignore-exit-code", "1"]);
        assert_eq!(cli.retries, 2);
        assert_eq!(cli.ignore_exit_codes, [57, 1]);
        assert!(cli.packages.is_empty());
    }

    #[test]
    fn test_help_is_a_flag() {
        let cli = parse(&["-h"]);
        assert!(cli.help);
        assert!(parse(&["--HELP"]).help);
    }

    #[test]
    fn test_unknown_flag() {
        let err = Cli::parse_args(["mkvfx", "--frobnicate", "zlib"]).unwrap_err();
        assert!(matches!(err, Error::UnknownOption(token) if token == "--frobnicate"));
    }

    #[allow(dead_code)]
    mod man_page {
        include!(concat!(env!("CARGO_MANIFEST_DIR"), "/build.rs"));
    }

    /// (id, long, short, defaults) of every argument except the version flag
    fn describe(cmd: &clap::Command) -> Vec<(String, Option<String>, Option<char>, Vec<String>)> {
        let mut args: Vec<_> = cmd
            .get_arguments()
            .filter(|a| a.get_id() != "version")
            .map(|a| {
                (
                    a.get_id().to_string(),
                    a.get_long().map(String::from),
                    a.get_short(),
                    a.get_default_values()
                        .iter()
                        .map(|v| v.to_string_lossy().into_owned())
                        .collect(),
                )
            })
            .collect();
        args.sort();
        args
    }

    #[test]
    fn test_man_page_matches_cli() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let man = man_page::build_cli();
        assert_eq!(describe(&cli), describe(&man));
        assert_eq!(cli.get_about().map(|a| a.to_string()), man.get_about().map(|a| a.to_string()));
    }
}
