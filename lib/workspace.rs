//! Per-request workspace management for the pybox server.
//!
//! This module handles:
//! - Creation of uniquely named temporary directories
//! - Materialization of validated code and files into a workspace
//! - Unconditional teardown after the request completes
//!
//! A workspace exists only for the duration of one execution. Concurrent
//! requests share the temp root but never a workspace; isolation rests on
//! collision-resistant naming, not locking.

use std::path::{Path, PathBuf};

use chrono::Utc;
use getset::Getters;
use rand::{distr::Alphanumeric, Rng};
use tokio::fs as tokio_fs;

use crate::{error::ServerResult, validate::ExecutionRequest};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Fixed name of the entry-point file the interpreter is invoked against
pub const ENTRY_POINT_FILENAME: &str = "main.py";

/// Length of the random component in a workspace name
const NAME_RANDOM_LEN: usize = 7;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A uniquely named directory owning all files for one execution
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Workspace {
    /// Absolute root of the workspace directory
    root: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Workspace {
    /// Create a fresh workspace directory under the given temp root.
    ///
    /// The name combines a millisecond timestamp with a random suffix so
    /// concurrent requests never collide.
    pub async fn acquire(temp_root: &Path) -> ServerResult<Self> {
        let suffix: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(NAME_RANDOM_LEN)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        let root = temp_root.join(format!(
            "python-exec-{}-{}",
            Utc::now().timestamp_millis(),
            suffix
        ));

        tokio_fs::create_dir_all(&root).await?;
        tracing::debug!("acquired workspace {}", root.display());

        Ok(Self { root })
    }

    /// Write the entry point and all auxiliary files into the workspace.
    ///
    /// Names were sanitized during validation, but each resolved path is
    /// re-verified to be lexically contained in the workspace root before
    /// writing; an escaping path is skipped and logged, never written.
    ///
    /// Returns the path of the entry-point file.
    pub async fn materialize(&self, request: &ExecutionRequest) -> ServerResult<PathBuf> {
        let entry = self.root.join(ENTRY_POINT_FILENAME);
        tokio_fs::write(&entry, &request.code).await?;

        for file in &request.files {
            let path = self.root.join(&file.name);
            if !self.contains(&path, &file.name) {
                tracing::warn!("path traversal attempt detected: {}", file.name);
                continue;
            }
            tokio_fs::write(&path, &file.content).await?;
        }

        Ok(entry)
    }

    /// Recursively delete the workspace.
    ///
    /// Deletion errors are logged and swallowed: cleanup must never mask or
    /// be masked by the primary result.
    pub async fn release(self) {
        if let Err(e) = tokio_fs::remove_dir_all(&self.root).await {
            tracing::error!("failed to clean up workspace {}: {}", self.root.display(), e);
        }
    }

    /// Lexical containment check: `path` must be a direct child of the
    /// workspace root whose file name is exactly `name`.
    fn contains(&self, path: &Path, name: &str) -> bool {
        path.parent() == Some(self.root.as_path())
            && path.file_name().and_then(|n| n.to_str()) == Some(name)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::validate::SanitizedFile;

    use super::*;

    fn request(files: Vec<SanitizedFile>) -> ExecutionRequest {
        ExecutionRequest {
            code: "print('hi')".to_string(),
            files,
        }
    }

    #[tokio::test]
    async fn test_acquire_creates_unique_directories() {
        let temp = tempfile::tempdir().unwrap();
        let first = Workspace::acquire(temp.path()).await.unwrap();
        let second = Workspace::acquire(temp.path()).await.unwrap();

        assert_ne!(first.get_root(), second.get_root());
        assert!(first.get_root().is_dir());
        assert!(second.get_root().is_dir());

        first.release().await;
        second.release().await;
    }

    #[tokio::test]
    async fn test_materialize_writes_entry_point_and_files() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(temp.path()).await.unwrap();

        let entry = workspace
            .materialize(&request(vec![SanitizedFile {
                name: "helper.py".to_string(),
                content: "def greet(): pass\n".to_string(),
            }]))
            .await
            .unwrap();

        assert_eq!(entry, workspace.get_root().join(ENTRY_POINT_FILENAME));
        assert_eq!(
            std::fs::read_to_string(&entry).unwrap(),
            "print('hi')"
        );
        assert_eq!(
            std::fs::read_to_string(workspace.get_root().join("helper.py")).unwrap(),
            "def greet(): pass\n"
        );

        workspace.release().await;
    }

    #[tokio::test]
    async fn test_materialize_skips_escaping_paths() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(temp.path()).await.unwrap();

        // Names like these are rejected upstream; the containment re-check
        // must still refuse to write them
        workspace
            .materialize(&request(vec![
                SanitizedFile {
                    name: "../escape.py".to_string(),
                    content: "x = 1".to_string(),
                },
                SanitizedFile {
                    name: "/tmp/absolute.py".to_string(),
                    content: "x = 1".to_string(),
                },
            ]))
            .await
            .unwrap();

        assert!(!temp.path().join("escape.py").exists());
        assert!(!Path::new("/tmp/absolute.py").exists());

        workspace.release().await;
    }

    #[tokio::test]
    async fn test_release_removes_workspace() {
        let temp = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(temp.path()).await.unwrap();
        let root = workspace.get_root().clone();

        workspace
            .materialize(&request(vec![]))
            .await
            .unwrap();
        workspace.release().await;

        assert!(!root.exists());
    }
}
