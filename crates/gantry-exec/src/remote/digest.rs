//! Digest computation and input-root construction
//!
//! RE v2 digests are lowercase SHA-256 hex plus the blob size. The input
//! root is a Merkle tree of Directory messages built from the task's
//! declared input globs; file contents become CAS blobs.

use std::collections::BTreeMap;
use std::path::Path;

use globset::{Glob, GlobSetBuilder};
use prost::Message;
use sha2::{Digest as _, Sha256};
use walkdir::WalkDir;

use super::proto::rev2::{Digest, Directory, DirectoryNode, FileNode};

/// Digest raw bytes
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest {
        hash: format!("{:x}", hasher.finalize()),
        size_bytes: data.len() as i64,
    }
}

/// Encode a message and digest the encoding
pub fn digest_message<M: Message>(message: &M) -> (Digest, Vec<u8>) {
    let bytes = message.encode_to_vec();
    (digest_bytes(&bytes), bytes)
}

/// The input root plus every blob that must exist in CAS for it
#[derive(Debug, Default)]
pub struct InputTree {
    /// Digest of the root Directory message
    pub root_digest: Digest,
    /// Blobs keyed by digest: directory encodings and file contents
    pub blobs: Vec<(Digest, Vec<u8>)>,
}

/// Build the input tree for a project directory from input glob patterns.
/// With no patterns the root is the canonical empty Directory.
pub fn build_input_tree(project_dir: &Path, patterns: &[String]) -> std::io::Result<InputTree> {
    let mut tree = TreeNode::default();

    if !patterns.is_empty() && project_dir.is_dir() {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        let set = builder
            .build()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        for entry in WalkDir::new(project_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry
                .path()
                .strip_prefix(project_dir)
                .unwrap_or(entry.path());
            if !set.is_match(relative) {
                continue;
            }
            let contents = std::fs::read(entry.path())?;
            let executable = is_executable(entry.path());
            tree.insert(relative, contents, executable);
        }
    }

    let mut blobs = Vec::new();
    let root_digest = tree.seal(&mut blobs);
    Ok(InputTree { root_digest, blobs })
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}

/// In-memory directory tree accumulated before sealing into Directory
/// messages
#[derive(Debug, Default)]
struct TreeNode {
    files: BTreeMap<String, (Digest, Vec<u8>, bool)>,
    dirs: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn insert(&mut self, relative: &Path, contents: Vec<u8>, executable: bool) {
        let mut components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let Some(file_name) = components.pop() else {
            return;
        };

        let mut node = self;
        for dir in components {
            node = node.dirs.entry(dir).or_default();
        }
        let digest = digest_bytes(&contents);
        node.files.insert(file_name, (digest, contents, executable));
    }

    /// Serialize bottom-up, pushing every directory encoding and file blob,
    /// and return the digest of this node's Directory message.
    fn seal(self, blobs: &mut Vec<(Digest, Vec<u8>)>) -> Digest {
        let mut directory = Directory::default();

        for (name, (digest, contents, executable)) in self.files {
            blobs.push((digest.clone(), contents));
            directory.files.push(FileNode {
                name,
                digest: Some(digest),
                is_executable: executable,
            });
        }

        for (name, child) in self.dirs {
            let child_digest = child.seal(blobs);
            directory.directories.push(DirectoryNode {
                name,
                digest: Some(child_digest),
            });
        }

        let (digest, bytes) = digest_message(&directory);
        blobs.push((digest.clone(), bytes));
        digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_digest_bytes_known_value() {
        let digest = digest_bytes(b"");
        assert_eq!(
            digest.hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(digest.size_bytes, 0);
    }

    #[test]
    fn test_empty_tree_is_empty_directory() {
        let temp = TempDir::new().unwrap();
        let tree = build_input_tree(temp.path(), &[]).unwrap();

        // The root blob is the encoded empty Directory
        assert_eq!(tree.blobs.len(), 1);
        let (digest, bytes) = &tree.blobs[0];
        assert!(bytes.is_empty());
        assert_eq!(*digest, tree.root_digest);
    }

    #[test]
    fn test_tree_contains_matched_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/main.go"), "package main\n").unwrap();
        std::fs::write(temp.path().join("go.mod"), "module m\n").unwrap();
        std::fs::write(temp.path().join("README.md"), "# readme\n").unwrap();

        let patterns = vec!["src/**".to_string(), "go.mod".to_string()];
        let tree = build_input_tree(temp.path(), &patterns).unwrap();

        // Two file blobs plus two directory blobs (root and src/)
        assert_eq!(tree.blobs.len(), 4);
        assert!(!tree.root_digest.hash.is_empty());
    }

    #[test]
    fn test_root_digest_changes_with_content() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("input.txt"), "one").unwrap();
        let patterns = vec!["*.txt".to_string()];
        let first = build_input_tree(temp.path(), &patterns).unwrap();

        std::fs::write(temp.path().join("input.txt"), "two").unwrap();
        let second = build_input_tree(temp.path(), &patterns).unwrap();

        assert_ne!(first.root_digest, second.root_digest);
    }

    #[test]
    fn test_root_digest_deterministic() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        std::fs::write(temp.path().join("b.txt"), "b").unwrap();
        let patterns = vec!["*.txt".to_string()];

        let first = build_input_tree(temp.path(), &patterns).unwrap();
        let second = build_input_tree(temp.path(), &patterns).unwrap();
        assert_eq!(first.root_digest, second.root_digest);
    }
}
