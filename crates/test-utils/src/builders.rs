#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch project directory with content and data subdirectories.
///
/// The fixture owns the temp directory; everything is removed on drop.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Create a fixture with `src/` and `data/` subdirectories.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("creating temp project dir");
        std::fs::create_dir_all(dir.path().join("src")).expect("creating content dir");
        std::fs::create_dir_all(dir.path().join("data")).expect("creating data dir");
        Self { dir }
    }

    /// Absolute project root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve a project-relative path.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file at a project-relative path, creating parents.
    pub fn write(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating parent dirs");
        }
        std::fs::write(&path, contents).expect("writing fixture file");
        path
    }

    /// Write `assetpipeline.toml` at the project root.
    pub fn write_build_config(&self, toml: &str) {
        self.write("assetpipeline.toml", toml.as_bytes());
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A scratch directory holding a project database.
pub struct StoreFixture {
    dir: TempDir,
}

impl StoreFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("creating temp store dir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("assetpipe.db")
    }

    /// Open (creating if needed) the store at [`Self::db_path`].
    pub fn open(&self) -> assetpipe::store::ProjectStore {
        assetpipe::store::ProjectStore::create_or_open(&self.db_path())
    }
}

impl Default for StoreFixture {
    fn default() -> Self {
        Self::new()
    }
}
