//! Local file storage for uploaded originals and signed artifacts
//!
//! Paths handed out and stored in the database are relative to the storage
//! root, e.g. `documents/<uuid>.pdf` or `signed/signed_<millis>_<id>_<title>`.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

pub const ORIGINALS_DIR: &str = "documents";
pub const SIGNED_DIR: &str = "signed";

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub async fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join(ORIGINALS_DIR)).await?;
        tokio::fs::create_dir_all(root.join(SIGNED_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored relative path, refusing anything that would escape
    /// the storage root.
    pub fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if relative.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage path: {}", relative),
            ));
        }
        Ok(self.root.join(path))
    }

    /// Write the whole file next to its destination, then rename it into
    /// place. Readers never observe a partial file.
    pub async fn write(&self, relative: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.resolve(relative)?;
        let parent = target
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no parent directory"))?;
        tokio::fs::create_dir_all(parent).await?;

        let tmp = parent.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    pub async fn read(&self, relative: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve(relative)?).await
    }

    pub async fn remove(&self, relative: &str) -> io::Result<()> {
        tokio::fs::remove_file(self.resolve(relative)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();

        storage.write("signed/out.pdf", b"%PDF-1.7").await.unwrap();
        assert_eq!(storage.read("signed/out.pdf").await.unwrap(), b"%PDF-1.7");

        // No temporary files are left behind
        let mut entries = tokio::fs::read_dir(dir.path().join(SIGNED_DIR)).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["out.pdf".to_string()]);
    }

    #[tokio::test]
    async fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();

        storage.write("documents/a.pdf", b"old").await.unwrap();
        storage.write("documents/a.pdf", b"new").await.unwrap();
        assert_eq!(storage.read("documents/a.pdf").await.unwrap(), b"new");
    }

    #[test]
    fn resolve_rejects_escaping_paths() {
        let storage = FileStorage {
            root: PathBuf::from("/srv/docsign"),
        };
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("signed/../x.pdf").is_err());
        assert!(storage.resolve("").is_err());
        assert_eq!(
            storage.resolve("signed/x.pdf").unwrap(),
            PathBuf::from("/srv/docsign/signed/x.pdf")
        );
    }
}
