// src/recipe/fetch.rs

//! Source fetching for recipes
//!
//! Two strategies, chosen by the repository `type`:
//! - `git`: shallow clone into the source root, or `git pull` when the
//!   checkout already exists
//! - `curl-tgz`: download a gzipped tarball into the checkout directory and
//!   extract it there
//! - `zip`: download an archive (zip or tar, detected from its content) into
//!   the source root and unpack it there, once
//!
//! Fetched content is not verified.

use super::catalog::{Repository, RepositoryKind};
use super::context::BuildContext;
use super::exec::Executor;
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info, warn};

/// Timeout for a whole archive download (10 minutes)
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// History depth of git clones
const CLONE_DEPTH: u32 = 1;

/// Something that can fetch a URL into a local file
pub trait Downloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP downloader
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let mut file = File::create(dest)?;
        let bytes = io::copy(&mut response, &mut file)
            .map_err(|e| Error::DownloadError(format!("Failed to write {}: {e}", dest.display())))?;

        debug!("Downloaded {} bytes", bytes);
        Ok(())
    }
}

fn extract_error(archive: &Path, reason: impl fmt::Display) -> Error {
    Error::ExtractError {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Extract a `.tar.gz` archive into `dest`
pub fn extract_tarball(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| extract_error(archive, e))?;

    Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .map_err(|e| extract_error(archive, e))
}

/// Extract a zip, gzipped tar or plain tar archive into `dest`
///
/// The format is taken from the leading magic bytes, not the file name.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let mut magic = [0u8; 4];
    let read = File::open(archive)
        .and_then(|mut f| f.read(&mut magic))
        .map_err(|e| extract_error(archive, e))?;

    match &magic[..read] {
        [0x50, 0x4b, 0x03, 0x04] => extract_zip(archive, dest),
        [0x1f, 0x8b, ..] => extract_tarball(archive, dest),
        _ => {
            let file = File::open(archive).map_err(|e| extract_error(archive, e))?;
            Archive::new(file)
                .unpack(dest)
                .map_err(|e| extract_error(archive, format!("unrecognized archive: {e}")))
        }
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| extract_error(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| extract_error(archive_path, format!("Failed to read zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extract_error(archive_path, format!("Failed to read zip entry: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping zip entry outside the archive root: {}", entry.name());
            continue;
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| extract_error(archive_path, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| extract_error(archive_path, e))?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| extract_error(archive_path, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| extract_error(archive_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                    .map_err(|e| extract_error(archive_path, e))?;
            }
        }
    }

    debug!("Extracted {} zip entries", archive.len());
    Ok(())
}

/// Last path segment of `url`, without query or fragment
fn archive_file_name<'u>(url: &'u str, fallback: &'u str) -> &'u str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
}

/// Quote a path for inclusion in a shell command line
fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// Build the git command that brings `dir_name` up to date
///
/// An existing checkout is pulled; otherwise a shallow clone is made into
/// the source root.
pub fn git_command(
    ctx: &BuildContext,
    url: &str,
    branch: Option<&str>,
    dir_name: &str,
) -> String {
    let dir_path = ctx.source_dir(dir_name);
    if dir_path.exists() {
        return format!("git -C {} pull", quoted(&dir_path));
    }

    let branch_arg = match branch {
        Some(b) => format!(" --branch {}", b),
        None => String::new(),
    };

    format!(
        "git -C {} clone --depth {}{} {} {}",
        quoted(&ctx.source_root),
        CLONE_DEPTH,
        branch_arg,
        url,
        dir_name
    )
}

/// Fetches package sources into the source root
pub struct Fetcher<'a> {
    ctx: &'a BuildContext,
    executor: &'a dyn Executor,
    downloader: &'a dyn Downloader,
    dry_run: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(
        ctx: &'a BuildContext,
        executor: &'a dyn Executor,
        downloader: &'a dyn Downloader,
        dry_run: bool,
    ) -> Self {
        Self {
            ctx,
            executor,
            downloader,
            dry_run,
        }
    }

    /// Fetch the source of `package` into `<source-root>/<dir_name>`
    pub fn fetch(&self, package: &str, repo: &Repository, dir_name: &str) -> Result<()> {
        let Some(url) = repo.url_for(self.ctx.platform) else {
            warn!("No {} url for {}, nothing to fetch", self.ctx.platform, package);
            return Ok(());
        };

        println!("Fetching {} from {}", package, url);

        match &repo.kind {
            RepositoryKind::Git => self.fetch_git(url, repo.branch.as_deref(), dir_name),
            RepositoryKind::CurlTgz => self.fetch_tarball(package, url, dir_name),
            RepositoryKind::Zip => self.fetch_archive(url, dir_name),
            RepositoryKind::Unknown(kind) => {
                warn!("Unknown repository type '{}' for {}, not fetching", kind, package);
                Ok(())
            }
        }
    }

    fn fetch_git(&self, url: &str, branch: Option<&str>, dir_name: &str) -> Result<()> {
        let cmd = git_command(self.ctx, url, branch, dir_name);
        if self.dry_run {
            println!("Simulating: {}", cmd);
            return Ok(());
        }

        self.executor.run(&cmd, None)?;
        Ok(())
    }

    fn fetch_tarball(&self, package: &str, url: &str, dir_name: &str) -> Result<()> {
        let dir_path = self.ctx.source_dir(dir_name);
        let archive = dir_path.join(format!("{}.tgz", package));

        if self.dry_run {
            println!("Simulating: download {} to {}", url, archive.display());
            println!("Simulating: extract {} in {}", archive.display(), dir_path.display());
            return Ok(());
        }

        if !dir_path.is_dir() {
            fs::create_dir_all(&dir_path).map_err(|e| Error::DirectoryError {
                path: dir_path.clone(),
                reason: e.to_string(),
            })?;
        }

        self.downloader.download(url, &archive)?;

        info!("Extracting {} in {}", archive.display(), dir_path.display());
        extract_tarball(&archive, &dir_path)
    }

    fn fetch_archive(&self, url: &str, dir_name: &str) -> Result<()> {
        let source_root = &self.ctx.source_root;
        let archive = source_root.join(archive_file_name(url, dir_name));
        let dir_path = self.ctx.source_dir(dir_name);

        if self.dry_run {
            println!("Simulating: download {} to {}", url, archive.display());
            println!("Simulating: extract {} in {}", archive.display(), source_root.display());
            return Ok(());
        }

        if archive.is_file() {
            info!("{} already exists, skipping download", archive.display());
        } else {
            fs::create_dir_all(source_root).map_err(|e| Error::DirectoryError {
                path: source_root.clone(),
                reason: e.to_string(),
            })?;
            self.downloader.download(url, &archive)?;
        }

        if dir_path.is_dir() {
            info!("{} already exists, skipping extract", dir_path.display());
            return Ok(());
        }

        info!("Extracting {} in {}", archive.display(), source_root.display());
        extract_archive(&archive, source_root)
    }
}
