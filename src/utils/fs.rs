//! File system utilities.

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::Other(format!(
            "Not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Write a file by writing a sibling temp file and renaming it into place.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Load a JSON document, returning the default value if the file does not exist.
pub async fn load_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Serialize a value as pretty JSON and write it atomically.
pub async fn save_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
        .await
        .map_err(|source| crate::Error::HistoryPersistence {
            path: path.display().to_string(),
            source,
        })
}

/// Move a file from one location to another.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Try rename first (fast, same filesystem)
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    // Fall back to copy + delete (cross filesystem)
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

/// Normalize a project-relative path to forward slashes, rejecting `..` escapes.
pub fn normalize_relative(path: &str) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(crate::Error::OutsideProject(path.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(crate::Error::OutsideProject(path.to_string()));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a memory bank document based on extension.
pub fn is_document(path: &Path) -> bool {
    const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "mdx", "txt"];

    get_extension(path)
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// List every document under `root` as sorted project-relative paths.
///
/// Hidden directories (including the state directory) are skipped.
pub fn list_documents(root: &Path) -> Vec<String> {
    let mut documents: Vec<String> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_document(e.path()))
        .filter_map(|e| relative_to(root, e.path()))
        .collect();
    documents.sort();
    documents
}

/// List every file under `dir` (recursively) as project-relative paths.
pub fn list_files_under(root: &Path, dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| relative_to(root, e.path()))
        .collect();
    files.sort();
    files
}

/// Express `path` relative to `root` with forward slashes.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel: PathBuf = path.strip_prefix(root).ok()?.to_path_buf();
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_document() {
        assert!(is_document(&PathBuf::from("notes.md")));
        assert!(is_document(&PathBuf::from("NOTES.MD")));
        assert!(!is_document(&PathBuf::from("image.png")));
        assert!(!is_document(&PathBuf::from("Makefile")));
    }

    #[test]
    fn test_normalize_relative() {
        assert_eq!(normalize_relative("./a/b.md").unwrap(), "a/b.md");
        assert_eq!(normalize_relative("a/../b.md").unwrap(), "b.md");
        assert!(normalize_relative("../b.md").is_err());
        assert!(normalize_relative("/etc/passwd").is_err());
    }

    #[test]
    fn test_list_documents_skips_hidden() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".membank/history")).unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join(".membank/history/a_v1.md"), "x").unwrap();
        std::fs::write(dir.path().join("notes/b.md"), "x").unwrap();
        std::fs::write(dir.path().join("a.md"), "x").unwrap();

        let docs = list_documents(dir.path());
        assert_eq!(docs, vec!["a.md".to_string(), "notes/b.md".to_string()]);
    }

    #[tokio::test]
    async fn test_write_atomic_creates_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deeply").join("nested").join("file.json");
        write_atomic(&path, b"{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
