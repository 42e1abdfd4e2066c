// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use mkvfx::recipe::{CommandOutput, Downloader, Executor};
use mkvfx::{BuildContext, Platform, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build context whose three roots live in a fresh temporary directory.
///
/// Returns (TempDir, context) - keep the TempDir alive to prevent cleanup.
pub fn temp_context() -> (TempDir, BuildContext) {
    let temp = tempfile::tempdir().unwrap();
    let ctx = BuildContext::new(
        temp.path().join("local"),
        temp.path().join("mkvfx-sources"),
        temp.path().join("mkvfx-build"),
        Platform::detect().unwrap(),
    );
    ctx.scaffold().unwrap();
    (temp, ctx)
}

/// Executor that records commands instead of running them.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: RefCell<Vec<(String, Option<PathBuf>)>>,
}

impl RecordingExecutor {
    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, command: &str, working_dir: Option<&Path>) -> Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), working_dir.map(Path::to_path_buf)));
        Ok(CommandOutput::default())
    }
}

/// Downloader that serves one local file for every URL.
pub struct LocalDownloader {
    pub archive: PathBuf,
    pub urls: RefCell<Vec<String>>,
}

impl LocalDownloader {
    pub fn new(archive: PathBuf) -> Self {
        Self {
            archive,
            urls: RefCell::new(Vec::new()),
        }
    }
}

impl Downloader for LocalDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.urls.borrow_mut().push(url.to_string());
        fs::copy(&self.archive, dest)?;
        Ok(())
    }
}

/// Write a gzipped tarball containing `files` (path, content) to `path`.
pub fn write_tarball(path: &Path, files: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}
