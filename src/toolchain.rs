// src/toolchain.rs

//! Host toolchain checks run before any recipe is baked
//!
//! `git` is always required. The build tools recipes usually call (`make`,
//! `cmake`, `7z`, `premake5`) are only probed: a recipe that needs a missing
//! one fails later with a normal command error, so a missing optional tool is
//! a warning here.

use crate::error::{Error, Result};
use crate::recipe::Platform;
use std::env;
use std::process::Command;
use tracing::{debug, warn};

/// Environment variable set by the Visual Studio developer prompt
const VISUAL_STUDIO_ENV: &str = "VisualStudioVersion";

/// Versions of the tools found on the host
#[derive(Debug, Default)]
pub struct Toolchain {
    pub git: Option<String>,
    pub make: Option<String>,
    pub cmake: Option<String>,
    pub sevenzip: Option<String>,
    pub premake: Option<String>,
    pub visual_studio: Option<String>,
}

impl Toolchain {
    /// Probe the tools relevant on `platform`
    pub fn check(platform: Platform) -> Self {
        let windows = platform == Platform::Windows;

        Self {
            git: Self::find_version("git", &["--version"]),
            make: if windows {
                None
            } else {
                Self::find_version("make", &["--version"])
            },
            cmake: Self::find_version("cmake", &["--version"]),
            sevenzip: if windows {
                Self::find_banner("7z")
            } else {
                None
            },
            premake: Self::find_version("premake5", &["--version"]),
            visual_studio: if windows {
                env::var(VISUAL_STUDIO_ENV).ok()
            } else {
                None
            },
        }
    }

    /// Probe the host and fail when a required tool is missing
    pub fn require(platform: Platform) -> Result<Self> {
        let toolchain = Self::check(platform);
        toolchain.verify(platform)?;
        Ok(toolchain)
    }

    /// Check required tools, warning about missing optional ones
    pub fn verify(&self, platform: Platform) -> Result<()> {
        match &self.git {
            Some(version) => debug!("Found {}", version),
            None => {
                return Err(Error::ToolNotFound(
                    "git is required but was not found in PATH".to_string(),
                ))
            }
        }

        if platform == Platform::Windows && self.visual_studio.is_none() {
            return Err(Error::EnvironmentError(format!(
                "{} is not set; run mkvfx from a Visual Studio developer prompt",
                VISUAL_STUDIO_ENV
            )));
        }

        let missing = self.missing_optional(platform);
        if !missing.is_empty() {
            warn!("Optional build tools not found: {}", missing.join(", "));
        }

        Ok(())
    }

    /// Optional tools for `platform` that were not found
    pub fn missing_optional(&self, platform: Platform) -> Vec<&'static str> {
        let windows = platform == Platform::Windows;
        let mut missing = Vec::new();

        if !windows && self.make.is_none() {
            missing.push("make");
        }
        if self.cmake.is_none() {
            missing.push("cmake");
        }
        if windows && self.sevenzip.is_none() {
            missing.push("7z");
        }
        if self.premake.is_none() {
            missing.push("premake5");
        }
        missing
    }

    /// First output line of `cmd args`, if the tool is on PATH and exits
    /// successfully
    fn find_version(cmd: &str, args: &[&str]) -> Option<String> {
        Self::probe(cmd, args, true)
    }

    /// Like [`find_version`](Self::find_version), but any exit status counts
    ///
    /// `7z` prints its banner and exits non-zero when run without a command.
    fn find_banner(cmd: &str) -> Option<String> {
        Self::probe(cmd, &[], false)
    }

    fn probe(cmd: &str, args: &[&str], require_success: bool) -> Option<String> {
        let path = which::which(cmd).ok()?;
        let output = Command::new(&path).args(args).output().ok()?;
        if require_success && !output.status.success() {
            debug!("{} exited with {}", cmd, output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().find(|l| !l.trim().is_empty());
        Some(
            first
                .map(|l| l.trim().to_string())
                .unwrap_or_else(|| format!("{} ({})", cmd, path.display())),
        )
    }
}
