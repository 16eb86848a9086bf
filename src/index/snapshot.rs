//! Atomic snapshot persistence.
//!
//! A snapshot version is a directory holding the three artifacts; the
//! `CURRENT` pointer file names the published version. Publishing stages the
//! artifacts in a temp directory, renames it into place, then swaps the
//! pointer with a second rename. Readers that follow the pointer therefore
//! see a complete old version or a complete new version, never a mixture,
//! and a failed publish leaves the pointer untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::IndexError;
use super::flat::{self, FlatIndex};
use crate::ingest::metadata::MetadataRecord;

pub const INDEX_FILE: &str = "index.bin";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const METADATA_FILE: &str = "metadata.json";
const CURRENT_FILE: &str = "CURRENT";

/// One self-consistent set of {index, vectors, metadata}.
///
/// Construction validates the alignment invariant, and the fields stay
/// private afterwards, so a `Snapshot` value cannot exist misaligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    index: FlatIndex,
    vectors: Vec<Vec<f32>>,
    metadata: Vec<MetadataRecord>,
}

impl Snapshot {
    /// Assembles a snapshot, verifying `index.len() == vectors.len() ==
    /// metadata.len()` and that every vector matches the index dimension.
    pub fn new(
        index: FlatIndex,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<MetadataRecord>,
    ) -> Result<Self, IndexError> {
        if index.len() != vectors.len() || vectors.len() != metadata.len() {
            return Err(IndexError::AlignmentViolation {
                vectors: vectors.len(),
                metadata: metadata.len(),
                index: index.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != index.dim() {
                return Err(IndexError::DimensionMismatch {
                    expected: index.dim(),
                    actual: vector.len(),
                });
            }
        }
        Ok(Self {
            index,
            vectors,
            metadata,
        })
    }

    #[must_use]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[must_use]
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    #[must_use]
    pub fn metadata(&self) -> &[MetadataRecord] {
        &self.metadata
    }

    /// Number of chunks in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    fn vectors_to_bytes(&self) -> Vec<u8> {
        let mut rows = Vec::with_capacity(self.vectors.len() * self.index.dim());
        for vector in &self.vectors {
            rows.extend_from_slice(vector);
        }
        flat::encode_rows(flat::VECTORS_MAGIC, self.index.dim(), &rows)
    }

    fn vectors_from_bytes(bytes: &[u8]) -> Result<Vec<Vec<f32>>, IndexError> {
        let (dim, rows) = flat::decode_rows(flat::VECTORS_MAGIC, bytes)?;
        if dim == 0 {
            return Ok(Vec::new());
        }
        Ok(rows.chunks(dim).map(|row| row.to_vec()).collect())
    }
}

/// The outcome of looking for a published snapshot: none has ever been
/// published, or one is present. Kept as an explicit state instead of a
/// parse-failure fallback.
#[derive(Debug)]
pub enum SnapshotState {
    Missing,
    Present { version: String, snapshot: Snapshot },
}

/// Versioned snapshot directory with an atomically swapped `CURRENT`
/// pointer.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, IndexError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Name of the currently published version, if any.
    pub fn current_version(&self) -> Result<Option<String>, IndexError> {
        match fs::read_to_string(self.dir.join(CURRENT_FILE)) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes all three artifacts of a new version and publishes it.
    ///
    /// Returns the new version name. On any failure the previously published
    /// version remains the one loaders see.
    pub fn publish(&self, snapshot: &Snapshot) -> Result<String, IndexError> {
        let previous = self.current_version()?;
        let version = self.next_version();

        let staging = self.dir.join(format!("{version}.tmp"));
        fs::create_dir_all(&staging)?;
        if let Err(e) = self.write_artifacts(&staging, snapshot) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        let final_dir = self.dir.join(&version);
        fs::rename(&staging, &final_dir)?;

        // Pointer swap: the moment the rename lands, loaders see the new
        // version.
        let pointer_tmp = self.dir.join(format!("{CURRENT_FILE}.tmp"));
        fs::write(&pointer_tmp, &version)?;
        fs::rename(&pointer_tmp, self.dir.join(CURRENT_FILE))?;

        info!(
            "Published snapshot {version} ({} chunks)",
            snapshot.len()
        );
        self.prune(&version, previous.as_deref());
        Ok(version)
    }

    /// Loads the published snapshot, validating alignment.
    pub fn load_current(&self) -> Result<SnapshotState, IndexError> {
        let version = match self.current_version()? {
            Some(v) => v,
            None => return Ok(SnapshotState::Missing),
        };

        let dir = self.dir.join(&version);
        let index = FlatIndex::from_bytes(&fs::read(dir.join(INDEX_FILE))?)?;
        let vectors = Snapshot::vectors_from_bytes(&fs::read(dir.join(VECTORS_FILE))?)?;
        let metadata: Vec<MetadataRecord> =
            serde_json::from_slice(&fs::read(dir.join(METADATA_FILE))?)?;

        let snapshot = Snapshot::new(index, vectors, metadata)?;
        Ok(SnapshotState::Present { version, snapshot })
    }

    fn write_artifacts(&self, staging: &Path, snapshot: &Snapshot) -> Result<(), IndexError> {
        fs::write(staging.join(INDEX_FILE), snapshot.index.to_bytes())?;
        fs::write(staging.join(VECTORS_FILE), snapshot.vectors_to_bytes())?;
        fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_vec_pretty(&snapshot.metadata)?,
        )?;
        Ok(())
    }

    fn next_version(&self) -> String {
        let base = format!("v{}", chrono::Utc::now().timestamp_millis());
        let mut version = base.clone();
        let mut bump = 1;
        while self.dir.join(&version).exists() || self.dir.join(format!("{version}.tmp")).exists()
        {
            version = format!("{base}-{bump}");
            bump += 1;
        }
        version
    }

    /// Removes superseded version directories, keeping the new version and
    /// its immediate predecessor (a reader may still be loading it).
    fn prune(&self, current: &str, previous: Option<&str>) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(n) => n,
                None => continue,
            };
            if !name.starts_with('v') || name == current || Some(name) == previous {
                continue;
            }
            if entry.path().is_dir() {
                if let Err(e) = fs::remove_dir_all(entry.path()) {
                    warn!("Failed to prune old snapshot {name}: {e}");
                }
            }
        }
    }
}
