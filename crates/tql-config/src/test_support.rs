//! Scratch directory trees for tql-config unit tests.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use crate::discovery::CONFIG_FILENAME;

/// A temporary directory that config files can be dropped into.
pub struct TestDir {
    /// Deleted on drop.
    root: TempDir,
}

impl TestDir {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    /// The tree's root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates `rel_path` and any missing parents.
    pub fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes a `.tql.toml` holding `content` into `rel_dir` (`""` for the root).
    pub fn write_config(&self, rel_dir: &str, content: &str) -> PathBuf {
        let config = self.create_dir(rel_dir).join(CONFIG_FILENAME);
        fs::write(&config, content).unwrap();
        config
    }
}
