//! Filesystem corpus store.
//!
//! Layout under the configured data directory:
//!
//! ```text
//! data/
//!   raw/<name>                  original uploaded bytes
//!   text/<name>.txt             extracted plain text
//!   chunks/<name>_chunks.txt    chunk file, "\n---\n"-separated
//!   snapshots/                  published index snapshots
//! ```
//!
//! A document is superseded wholesale by re-uploading the same name; nothing
//! is merged or edited in place. Corpus iteration order is sorted by name so
//! repeated rebuilds see documents in the same stable order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

const TEXT_SUFFIX: &str = ".txt";
const CHUNKS_SUFFIX: &str = "_chunks.txt";
const CHUNK_SEPARATOR: &str = "\n---\n";

/// One document known to the store, with the presence of its two persisted
/// artifacts. Both must exist for the document to take part in a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub name: String,
    pub has_text: bool,
    pub has_chunks: bool,
}

/// Filesystem-backed corpus store rooted at a data directory.
pub struct CorpusStore {
    root: PathBuf,
}

impl CorpusStore {
    /// Opens (creating if needed) the store directory tree.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for sub in ["raw", "text", "chunks", "snapshots"] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create store dir {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    fn raw_path(&self, name: &str) -> PathBuf {
        self.root.join("raw").join(name)
    }

    fn text_path(&self, name: &str) -> PathBuf {
        self.root.join("text").join(format!("{name}{TEXT_SUFFIX}"))
    }

    fn chunks_path(&self, name: &str) -> PathBuf {
        self.root
            .join("chunks")
            .join(format!("{name}{CHUNKS_SUFFIX}"))
    }

    /// Persists the original uploaded bytes. Overwrites any previous upload
    /// of the same name.
    pub fn save_raw(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.raw_path(name);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write raw file {}", path.display()))?;
        debug!("Stored raw upload: {name} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Persists a document's extracted text.
    pub fn save_text(&self, name: &str, text: &str) -> Result<()> {
        let path = self.text_path(name);
        fs::write(&path, text)
            .with_context(|| format!("failed to write text file {}", path.display()))?;
        Ok(())
    }

    /// Persists a document's chunk file.
    pub fn save_chunks(&self, name: &str, chunks: &[String]) -> Result<()> {
        let path = self.chunks_path(name);
        fs::write(&path, join_chunks(chunks))
            .with_context(|| format!("failed to write chunk file {}", path.display()))?;
        Ok(())
    }

    /// Loads a document's extracted text, or `None` if no entry exists.
    pub fn load_text(&self, name: &str) -> Result<Option<String>> {
        read_optional(&self.text_path(name))
    }

    /// Loads and parses a document's chunk file, or `None` if no entry
    /// exists.
    pub fn load_chunks(&self, name: &str) -> Result<Option<Vec<String>>> {
        Ok(read_optional(&self.chunks_path(name))?.map(|s| split_chunks(&s)))
    }

    /// Lists every document the store knows about, sorted by name.
    ///
    /// A name appears once even when only one of its artifacts exists; the
    /// entry flags tell the caller which side is missing.
    pub fn list_documents(&self) -> Result<Vec<DocumentEntry>> {
        let mut names = std::collections::BTreeSet::new();
        let mut with_text = std::collections::BTreeSet::new();
        let mut with_chunks = std::collections::BTreeSet::new();

        for file in list_files(&self.root.join("text"))? {
            if let Some(name) = file.strip_suffix(TEXT_SUFFIX) {
                names.insert(name.to_string());
                with_text.insert(name.to_string());
            }
        }
        for file in list_files(&self.root.join("chunks"))? {
            if let Some(name) = file.strip_suffix(CHUNKS_SUFFIX) {
                names.insert(name.to_string());
                with_chunks.insert(name.to_string());
            }
        }

        Ok(names
            .into_iter()
            .map(|name| DocumentEntry {
                has_text: with_text.contains(&name),
                has_chunks: with_chunks.contains(&name),
                name,
            })
            .collect())
    }
}

/// Reduces an uploaded filename to a safe single path component.
///
/// Returns `None` for names that are empty or escape the store directory.
pub fn sanitize_name(name: &str) -> Option<String> {
    let candidate = Path::new(name).file_name()?.to_str()?.to_string();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return None;
    }
    Some(candidate)
}

fn join_chunks(chunks: &[String]) -> String {
    chunks.join(CHUNK_SEPARATOR)
}

fn split_chunks(contents: &str) -> Vec<String> {
    if contents.is_empty() {
        return Vec::new();
    }
    contents
        .split(CHUNK_SEPARATOR)
        .map(|s| s.to_string())
        .collect()
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_chunk_file_roundtrip() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        let chunks = vec![
            "first chunk".to_string(),
            "second chunk".to_string(),
            "third".to_string(),
        ];
        store.save_chunks("doc.txt", &chunks).unwrap();

        let loaded = store.load_chunks("doc.txt").unwrap().unwrap();
        assert_eq!(loaded, chunks);
    }

    #[test]
    fn test_missing_entries_are_none_not_errors() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        assert!(store.load_text("ghost.txt").unwrap().is_none());
        assert!(store.load_chunks("ghost.txt").unwrap().is_none());
    }

    #[test]
    fn test_list_documents_sorted_union() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        store.save_text("b.pdf", "text b").unwrap();
        store.save_chunks("b.pdf", &["text b".to_string()]).unwrap();
        store.save_text("a.txt", "text a").unwrap();
        // c has chunks but no text entry
        store.save_chunks("c.docx", &["orphan".to_string()]).unwrap();

        let docs = store.list_documents().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.pdf", "c.docx"]);

        assert!(docs[0].has_text && !docs[0].has_chunks);
        assert!(docs[1].has_text && docs[1].has_chunks);
        assert!(!docs[2].has_text && docs[2].has_chunks);
    }

    #[test]
    fn test_reupload_supersedes() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        store.save_text("doc.txt", "old contents").unwrap();
        store.save_text("doc.txt", "new contents").unwrap();
        assert_eq!(store.load_text("doc.txt").unwrap().unwrap(), "new contents");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("report.pdf"), Some("report.pdf".to_string()));
        assert_eq!(
            sanitize_name("nested/dir/report.pdf"),
            Some("report.pdf".to_string())
        );
        assert_eq!(sanitize_name(""), None);
        assert_eq!(sanitize_name(".."), None);
    }

    #[test]
    fn test_raw_bytes_persisted() {
        let temp = tempdir().unwrap();
        let store = CorpusStore::open(temp.path()).unwrap();

        store.save_raw("doc.pdf", &[0x25, 0x50, 0x44, 0x46]).unwrap();
        let on_disk = std::fs::read(temp.path().join("raw/doc.pdf")).unwrap();
        assert_eq!(on_disk, vec![0x25, 0x50, 0x44, 0x46]);
    }
}
